//! Test helpers shared by unit tests and downstream test crates.
//!
//! Enabled with the `test-util` feature.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use secrecy::SecretString;

use vivero_core::{Price, ProductId};

use crate::wishlist::{DEFAULT_IMAGE, RemoteError, WishlistApi, WishlistProduct};

/// Price every [`FakeWishlist`] product is listed at.
pub const FAKE_PRICE: Price = Price::new(12_000);

/// Stock given to products added through [`FakeWishlist`].
pub const FAKE_ADDED_STOCK: i64 = 5;

/// Build an unsigned token around a JSON payload.
#[must_use]
pub fn token_for(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.signature")
}

/// In-process wishlist keyed by product id, with stock per product,
/// switchable failures and a call log.
#[derive(Debug, Default)]
pub struct FakeWishlist {
    items: Mutex<BTreeMap<i64, i64>>,
    calls: Mutex<Vec<String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FakeWishlist {
    /// Start with `(product id, stock)` favorites.
    #[must_use]
    pub fn with_items(items: &[(i64, i64)]) -> Self {
        let fake = Self::default();
        fake.items.lock().unwrap().extend(items.iter().copied());
        fake
    }

    /// Favorite a product on the "server" without logging a call.
    pub fn insert(&self, id: i64, stock: i64) {
        self.items.lock().unwrap().insert(id, stock);
    }

    /// Make reads and/or writes fail with a 503.
    pub fn set_failing(&self, reads: bool, writes: bool) {
        self.fail_reads.store(reads, Ordering::SeqCst);
        self.fail_writes.store(writes, Ordering::SeqCst);
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than `list`.
    #[must_use]
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("list"))
            .collect()
    }

    /// Product ids currently favorited on the "server".
    #[must_use]
    pub fn ids(&self) -> Vec<i64> {
        self.items.lock().unwrap().keys().copied().collect()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn unavailable() -> RemoteError {
        RemoteError::Status {
            status: 503,
            message: "unavailable".into(),
        }
    }
}

impl WishlistApi for FakeWishlist {
    async fn list(&self, _token: &SecretString) -> Result<Vec<WishlistProduct>, RemoteError> {
        self.log("list".into());
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .map(|(id, stock)| WishlistProduct {
                id: ProductId::new(*id),
                name: format!("Planta {id}"),
                category: Some("Interior".into()),
                price: FAKE_PRICE,
                stock: *stock,
                image: DEFAULT_IMAGE.to_string(),
            })
            .collect())
    }

    async fn add(&self, _token: &SecretString, id: ProductId) -> Result<(), RemoteError> {
        self.log(format!("add {id}"));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.insert(id.as_i64(), FAKE_ADDED_STOCK);
        Ok(())
    }

    async fn remove(&self, _token: &SecretString, id: ProductId) -> Result<(), RemoteError> {
        self.log(format!("remove {id}"));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.items.lock().unwrap().remove(&id.as_i64());
        Ok(())
    }
}
