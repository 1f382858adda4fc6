//! Integration tests for the Vivero storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p vivero-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_migration` - Pre-login cart merged on sign-in
//! - `cross_tab` - Session changes seen by other tabs
//! - `wishlist` - Favorites reconciliation against a fake remote
//!
//! The remote API is replaced by [`FakeWishlist`]; storage is in memory or
//! in a temporary directory. Nothing here needs a network.

#![allow(clippy::missing_panics_doc)]

use std::sync::Arc;

use secrecy::SecretString;

use vivero_storefront::StorefrontContext;
use vivero_storefront::config::StorefrontConfig;
use vivero_storefront::storage::Storage;

pub use vivero_storefront::testing::{FAKE_PRICE, FakeWishlist, token_for};

/// Raw token for `subject` with its username set to the same value.
#[must_use]
pub fn raw_token(subject: &str) -> String {
    token_for(&serde_json::json!({ "id": subject, "username": subject }))
}

/// [`raw_token`] wrapped for the sign-in API.
#[must_use]
pub fn token_for_subject(subject: &str) -> SecretString {
    SecretString::from(raw_token(subject))
}

/// A context for one tab over the given storages, sharing `api`.
#[must_use]
pub fn tab_context(
    persistent: Arc<dyn Storage>,
    tab: Arc<dyn Storage>,
    api: &Arc<FakeWishlist>,
) -> StorefrontContext<Arc<FakeWishlist>> {
    StorefrontContext::new(StorefrontConfig::default(), persistent, tab, Arc::clone(api))
}
