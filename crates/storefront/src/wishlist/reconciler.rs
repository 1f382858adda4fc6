//! Wishlist reconciliation.
//!
//! The remote favorite set is the only source of truth. Every mutation is
//! followed by a refetch, and the favorite indicators are set to exactly what
//! that refetch returned. Nothing is toggled optimistically: another tab or
//! the server may have changed the set in the meantime.

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::instrument;

use vivero_core::{CartLineItem, Price, ProductId, Quantity};

use crate::cart::CartStore;
use crate::error::AppError;
use crate::session::{ClaimsReader, Namespace, SessionNamespace};

use super::{FavoriteSet, RemoteError, WishlistApi, WishlistProduct};

/// The mutation a toggle decided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// The product was not a favorite; it was added.
    Add,
    /// The product was a favorite; it was removed.
    Remove,
}

/// Result of [`WishlistReconciler::toggle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// The product that was toggled.
    pub product_id: ProductId,
    /// The mutation issued, `None` if membership could not be determined.
    pub mutation: Option<Mutation>,
    /// Whether the issued mutation was rejected or never reached the server.
    pub mutation_failed: bool,
    /// The set the indicators now show.
    pub favorites: FavoriteSet,
    /// Whether `favorites` is the last known-good set because the refetch failed.
    pub stale: bool,
}

impl ToggleOutcome {
    /// Whether the product is shown as a favorite after reconciliation.
    #[must_use]
    pub fn is_favorite(&self) -> bool {
        self.favorites.contains(self.product_id)
    }
}

/// Result of [`WishlistReconciler::add_to_cart`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddToCartOutcome {
    /// The product was added with fresh price data.
    Added(CartLineItem),
    /// The product is in the wishlist but out of stock; nothing was added.
    OutOfStock,
    /// The product is no longer in the wishlist; nothing was added.
    NotInWishlist,
    /// The wishlist could not be read; a placeholder line was added.
    Placeholder(CartLineItem),
}

/// Keeps favorite indicators in line with the remote wishlist.
pub struct WishlistReconciler<A> {
    api: A,
    session: SessionNamespace,
    favorites: watch::Sender<FavoriteSet>,
}

impl<A> std::fmt::Debug for WishlistReconciler<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistReconciler")
            .field("favorites", &*self.favorites.borrow())
            .finish_non_exhaustive()
    }
}

impl<A: WishlistApi> WishlistReconciler<A> {
    /// Create a reconciler. Indicators start empty.
    #[must_use]
    pub fn new(api: A, session: SessionNamespace) -> Self {
        let (favorites, _) = watch::channel(FavoriteSet::default());
        Self {
            api,
            session,
            favorites,
        }
    }

    /// The remote API.
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Subscribe to the favorite indicators.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FavoriteSet> {
        self.favorites.subscribe()
    }

    /// The set the indicators currently show.
    #[must_use]
    pub fn favorites(&self) -> FavoriteSet {
        self.favorites.borrow().clone()
    }

    /// Number of favorites currently shown.
    #[must_use]
    pub fn count(&self) -> usize {
        self.favorites.borrow().len()
    }

    /// Token of the current session, or `LoginRequired`.
    ///
    /// Resolved on every call; a token only counts if it names a subject.
    fn authenticated_token(&self) -> Result<SecretString, AppError> {
        let token = self.session.token().ok_or(AppError::LoginRequired)?;
        ClaimsReader::decode(token.expose_secret())
            .and_then(|claims| claims.subject_id)
            .ok_or(AppError::LoginRequired)?;
        Ok(token)
    }

    fn publish(&self, favorites: FavoriteSet) {
        self.favorites.send_if_modified(|current| {
            if *current == favorites {
                false
            } else {
                *current = favorites;
                true
            }
        });
    }

    /// Refetch the authoritative set and publish it.
    ///
    /// Returns the published set and whether it is stale (the refetch failed
    /// and the last known-good set was kept).
    async fn reconcile(&self, token: &SecretString) -> (FavoriteSet, bool) {
        match self.api.list(token).await {
            Ok(products) => {
                let favorites: FavoriteSet = products.iter().collect();
                self.publish(favorites.clone());
                (favorites, false)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Wishlist unavailable, keeping last known favorites");
                (self.favorites(), true)
            }
        }
    }

    /// Flip a product's favorite state.
    ///
    /// Reads the remote set, issues the inverse mutation, then refetches and
    /// publishes the authoritative set whether or not the mutation succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::LoginRequired`] without contacting the remote API
    /// when there is no authenticated session. Remote failures are not errors;
    /// they show up in the outcome.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn toggle(&self, product_id: ProductId) -> Result<ToggleOutcome, AppError> {
        let token = self.authenticated_token()?;

        let mutation = match self.api.list(&token).await {
            Ok(products) => Some(if products.iter().any(|p| p.id == product_id) {
                Mutation::Remove
            } else {
                Mutation::Add
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read wishlist before toggling");
                None
            }
        };

        let mutation_failed = match mutation {
            Some(Mutation::Add) => self.api.add(&token, product_id).await,
            Some(Mutation::Remove) => self.api.remove(&token, product_id).await,
            None => Ok(()),
        }
        .inspect_err(|e| tracing::warn!(error = %e, "Wishlist mutation failed"))
        .is_err();

        let (favorites, stale) = self.reconcile(&token).await;
        Ok(ToggleOutcome {
            product_id,
            mutation,
            mutation_failed,
            favorites,
            stale,
        })
    }

    /// Refetch the remote set and publish it.
    ///
    /// Without a session the indicators are cleared.
    ///
    /// # Errors
    ///
    /// Returns the remote error when the set cannot be read; the indicators
    /// keep their last known-good state.
    pub async fn refresh(&self) -> Result<FavoriteSet, RemoteError> {
        let Ok(token) = self.authenticated_token() else {
            self.publish(FavoriteSet::default());
            return Ok(FavoriteSet::default());
        };
        let favorites: FavoriteSet = self.api.list(&token).await?.iter().collect();
        self.publish(favorites.clone());
        Ok(favorites)
    }

    /// The wishlist products, also publishing their ids.
    ///
    /// # Errors
    ///
    /// Returns `LoginRequired` without a session, or the remote error.
    pub async fn items(&self) -> Result<Vec<WishlistProduct>, AppError> {
        let token = self.authenticated_token()?;
        let products = self.api.list(&token).await?;
        self.publish(products.iter().collect());
        Ok(products)
    }

    /// Remove one product, then reconcile.
    ///
    /// # Errors
    ///
    /// Returns `LoginRequired` without a session.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove(&self, product_id: ProductId) -> Result<FavoriteSet, AppError> {
        let token = self.authenticated_token()?;
        if let Err(e) = self.api.remove(&token, product_id).await {
            tracing::warn!(error = %e, "Wishlist removal failed");
        }
        Ok(self.reconcile(&token).await.0)
    }

    /// Remove every product one by one, ignoring individual failures, then
    /// reconcile.
    ///
    /// # Errors
    ///
    /// Returns `LoginRequired` without a session.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<FavoriteSet, AppError> {
        let token = self.authenticated_token()?;
        match self.api.list(&token).await {
            Ok(products) => {
                for product in &products {
                    if let Err(e) = self.api.remove(&token, product.id).await {
                        tracing::warn!(product_id = %product.id, error = %e, "Wishlist removal failed");
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "Could not read wishlist to clear it"),
        }
        Ok(self.reconcile(&token).await.0)
    }

    /// Add a wishlist product to the current cart with quantity one.
    ///
    /// The wishlist is re-read for fresh price and stock. If it cannot be
    /// read, a placeholder line is added instead. The cart namespace is
    /// resolved after the remote read, so a sign-out in another tab while
    /// the request is in flight never writes into the old subject's cart.
    ///
    /// # Errors
    ///
    /// Returns `LoginRequired` without a session, before or after the remote
    /// read, or a storage error if the cart cannot be written.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_cart(&self, product_id: ProductId) -> Result<AddToCartOutcome, AppError> {
        let token = self.authenticated_token()?;

        let outcome = match self.api.list(&token).await {
            Ok(products) => match products.into_iter().find(|p| p.id == product_id) {
                Some(product) if product.in_stock() => {
                    let line = CartLineItem::new(product.id, product.name, product.price, Quantity::ONE)
                        .with_image(product.image);
                    AddToCartOutcome::Added(line)
                }
                Some(_) => AddToCartOutcome::OutOfStock,
                None => AddToCartOutcome::NotInWishlist,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Wishlist unavailable, adding placeholder line");
                AddToCartOutcome::Placeholder(CartLineItem::new(
                    product_id,
                    vivero_core::DEFAULT_ITEM_NAME,
                    Price::ZERO,
                    Quantity::ONE,
                ))
            }
        };

        if let AddToCartOutcome::Added(line) | AddToCartOutcome::Placeholder(line) = &outcome {
            let namespace = self.session.resolve();
            if namespace == Namespace::NoSession {
                tracing::info!("Session ended during wishlist read, cart left untouched");
                return Err(AppError::LoginRequired);
            }
            CartStore::new(self.session.persistent().clone(), namespace).upsert(line.clone())?;
        }
        Ok(outcome)
    }
}
