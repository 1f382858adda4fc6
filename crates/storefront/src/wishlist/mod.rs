//! Remote wishlist access and favorite-indicator reconciliation.

mod api;
mod product;
mod reconciler;

pub use api::{ApiClient, RemoteError, WishlistApi};
pub use product::{DEFAULT_IMAGE, FavoriteSet, StockLevel, WishlistProduct};
pub use reconciler::{AddToCartOutcome, Mutation, ToggleOutcome, WishlistReconciler};

