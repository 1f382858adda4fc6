//! Persisted carts.

use std::fmt;
use std::sync::Arc;

use vivero_core::{Cart, CartLineItem, Price, ProductId, RawLineItem};

use crate::session::{Namespace, keys};
use crate::storage::{Storage, StorageError, read_json};

/// Which persisted cart a [`CartStore`] operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartTarget {
    /// The cart of a session namespace.
    Namespace(Namespace),
    /// The global pre-login cart.
    Legacy,
}

impl CartTarget {
    fn key(&self) -> Option<String> {
        match self {
            Self::Namespace(namespace) => namespace.cart_key(),
            Self::Legacy => Some(keys::LEGACY_CART.to_string()),
        }
    }
}

/// Reads and writes one persisted cart.
///
/// Every mutation reads the whole cart, applies the change, and writes the
/// whole cart back. Another tab writing the same key in between is silently
/// overwritten.
#[derive(Clone)]
pub struct CartStore {
    storage: Arc<dyn Storage>,
    target: CartTarget,
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Store for a namespace's cart. Inert for [`Namespace::NoSession`].
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, namespace: Namespace) -> Self {
        Self {
            storage,
            target: CartTarget::Namespace(namespace),
        }
    }

    /// Store for the pre-login cart.
    #[must_use]
    pub fn legacy(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            target: CartTarget::Legacy,
        }
    }

    /// The cart this store reads and writes.
    #[must_use]
    pub const fn target(&self) -> &CartTarget {
        &self.target
    }

    /// Read the cart.
    ///
    /// Empty without a session, when nothing is stored, or when the stored
    /// value cannot be parsed.
    #[must_use]
    pub fn read(&self) -> Cart {
        let Some(key) = self.target.key() else {
            return Cart::new();
        };
        read_json::<serde_json::Value>(self.storage.as_ref(), &key)
            .map(|value| Cart::from_raw(&RawLineItem::parse_list(value)))
            .unwrap_or_default()
    }

    /// Whether a cart value is stored at all, parseable or not.
    #[must_use]
    pub fn is_stored(&self) -> bool {
        self.target
            .key()
            .is_some_and(|key| self.storage.get(&key).is_some())
    }

    /// Replace the stored cart. No-op without a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage rejects the write.
    pub fn write(&self, cart: &Cart) -> Result<(), StorageError> {
        let Some(key) = self.target.key() else {
            tracing::debug!("No session, cart write skipped");
            return Ok(());
        };
        let body = serde_json::to_string(cart)?;
        self.storage.set(&key, &body)
    }

    /// Delete the stored cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage rejects the removal.
    pub fn clear(&self) -> Result<(), StorageError> {
        match self.target.key() {
            Some(key) => self.storage.remove(&key),
            None => Ok(()),
        }
    }

    /// Add an item, summing quantities with an existing line of the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage rejects the write.
    pub fn upsert(&self, item: CartLineItem) -> Result<(), StorageError> {
        self.modify(|cart| {
            cart.upsert(item);
            true
        })
    }

    /// Shift a line's quantity by `delta`, never below one.
    ///
    /// Returns `false` without writing if no line has that id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage rejects the write.
    pub fn set_quantity(&self, id: ProductId, delta: i64) -> Result<bool, StorageError> {
        let mut found = false;
        self.modify(|cart| {
            found = cart.set_quantity(id, delta);
            found
        })?;
        Ok(found)
    }

    /// Remove a line. Returns `false` without writing if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage rejects the write.
    pub fn remove(&self, id: ProductId) -> Result<bool, StorageError> {
        let mut found = false;
        self.modify(|cart| {
            found = cart.remove(id);
            found
        })?;
        Ok(found)
    }

    /// Sum of `unit_price * quantity` over the stored cart.
    #[must_use]
    pub fn total(&self) -> Price {
        self.read().total()
    }

    /// Sum of quantities over the stored cart.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.read().item_count()
    }

    fn modify(&self, apply: impl FnOnce(&mut Cart) -> bool) -> Result<(), StorageError> {
        let mut cart = self.read();
        if apply(&mut cart) {
            self.write(&cart)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use vivero_core::{Quantity, SubjectId};

    fn subject_store() -> (CartStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let namespace = Namespace::Subject(SubjectId::new("u1").unwrap());
        (CartStore::new(storage.clone(), namespace), storage)
    }

    fn item(id: i64, price: i64, qty: u32) -> CartLineItem {
        CartLineItem::new(ProductId::new(id), "Helecho", Price::new(price), Quantity::new(qty))
    }

    #[test]
    fn test_upsert_sums_quantities() {
        let (store, _) = subject_store();
        store.upsert(item(1, 100, 2)).unwrap();
        store.upsert(item(1, 100, 3)).unwrap();
        let cart = store.read();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity.get(), 5);
    }

    #[test]
    fn test_set_quantity_clamps_to_one() {
        let (store, _) = subject_store();
        store.upsert(item(1, 100, 2)).unwrap();
        assert!(store.set_quantity(ProductId::new(1), -10).unwrap());
        assert_eq!(store.read().items()[0].quantity.get(), 1);
        assert!(!store.set_quantity(ProductId::new(9), 1).unwrap());
    }

    #[test]
    fn test_remove_and_total() {
        let (store, _) = subject_store();
        store.upsert(item(1, 1_000, 2)).unwrap();
        store.upsert(item(2, 500, 1)).unwrap();
        assert_eq!(store.total(), Price::new(2_500));
        assert_eq!(store.item_count(), 3);
        assert!(store.remove(ProductId::new(1)).unwrap());
        assert!(!store.remove(ProductId::new(1)).unwrap());
        assert_eq!(store.total(), Price::new(500));
    }

    #[test]
    fn test_persisted_layout() {
        let (store, storage) = subject_store();
        store.upsert(item(7, 25_000, 1)).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&storage.get("lc_cart_u1").unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!([{"id": 7, "name": "Helecho", "price": 25000, "qty": 1}])
        );
    }

    #[test]
    fn test_malformed_data_reads_empty_and_heals() {
        let (store, storage) = subject_store();
        storage.set("lc_cart_u1", "{not a cart").unwrap();
        assert!(store.read().is_empty());
        assert!(store.is_stored());
        store.upsert(item(1, 100, 1)).unwrap();
        assert_eq!(store.read().len(), 1);
    }

    #[test]
    fn test_loose_stored_items_are_normalized() {
        let (store, storage) = subject_store();
        storage
            .set(
                "lc_cart_u1",
                r#"[{"id":"3","price":"99.6","qty":0},{"id":3,"qty":2},{"name":"no id"}]"#,
            )
            .unwrap();
        let cart = store.read();
        assert_eq!(cart.len(), 1);
        let line = &cart.items()[0];
        assert_eq!(line.name, vivero_core::DEFAULT_ITEM_NAME);
        assert_eq!(line.unit_price, Price::new(100));
        assert_eq!(line.quantity.get(), 3);
    }

    #[test]
    fn test_one_bad_field_keeps_the_other_lines() {
        let (store, storage) = subject_store();
        storage
            .set(
                "lc_cart_u1",
                r#"[{"id":1,"name":"Ficus","price":25000,"qty":1},
                    {"id":2,"name":"Aloe","price":9000,"unitPrice":9000,"qty":2},
                    {"id":3,"name":"Cactus","price":4000,"qty":1,"image":5}]"#,
            )
            .unwrap();
        let cart = store.read();
        assert_eq!(cart.len(), 3);
        assert_eq!(cart.total(), Price::new(47_000));
        assert_eq!(cart.get(ProductId::new(3)).unwrap().image_ref, None);
    }

    #[test]
    fn test_no_session_is_inert() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("lc_cart", r#"[{"id":1,"qty":1}]"#).unwrap();
        let store = CartStore::new(storage.clone(), Namespace::NoSession);

        store.upsert(item(1, 100, 1)).unwrap();
        store.write(&Cart::from_iter([item(2, 1, 1)])).unwrap();
        assert!(store.read().is_empty());
        assert!(!store.is_stored());
        assert_eq!(storage.get("lc_cart").as_deref(), Some(r#"[{"id":1,"qty":1}]"#));
    }

    #[test]
    fn test_legacy_store() {
        let storage = Arc::new(MemoryStorage::new());
        let store = CartStore::legacy(storage.clone());
        store.upsert(item(5, 25_000, 1)).unwrap();
        assert!(storage.get(keys::LEGACY_CART).is_some());
        store.clear().unwrap();
        assert!(storage.get(keys::LEGACY_CART).is_none());
    }
}
