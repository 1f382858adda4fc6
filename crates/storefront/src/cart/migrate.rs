//! One-time merge of the pre-login cart into the signed-in subject's cart.

use std::fmt;
use std::sync::Arc;

use crate::session::{Namespace, SessionNamespace};
use crate::storage::{Storage, StorageError};

use super::CartStore;

/// What a call to [`LegacyCartMigrator::migrate`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No legacy cart, or an empty or unreadable one.
    NothingToMigrate,
    /// A legacy cart exists but there is no session to merge it into yet.
    Deferred,
    /// The legacy cart was merged and deleted.
    Merged {
        /// Number of legacy lines merged.
        items: usize,
    },
}

/// Merges the legacy cart into the current namespace.
///
/// Idempotent: the legacy key is deleted only after the merged cart is
/// written, and is never touched while there is no session.
#[derive(Clone)]
pub struct LegacyCartMigrator {
    session: SessionNamespace,
    storage: Arc<dyn Storage>,
}

impl fmt::Debug for LegacyCartMigrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyCartMigrator")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl LegacyCartMigrator {
    /// Create a migrator over persistent storage.
    #[must_use]
    pub fn new(session: SessionNamespace, storage: Arc<dyn Storage>) -> Self {
        Self { session, storage }
    }

    /// Merge the legacy cart if there is one and a session exists.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the merged cart or deleting the legacy key
    /// fails. A failed write leaves the legacy cart in place.
    #[tracing::instrument(skip(self))]
    pub fn migrate(&self) -> Result<MigrationOutcome, StorageError> {
        let legacy_store = CartStore::legacy(self.storage.clone());
        let legacy = legacy_store.read();
        if legacy.is_empty() {
            return Ok(MigrationOutcome::NothingToMigrate);
        }

        let namespace = self.session.resolve();
        if namespace == Namespace::NoSession {
            tracing::debug!(items = legacy.len(), "Legacy cart kept until a session exists");
            return Ok(MigrationOutcome::Deferred);
        }

        let target = CartStore::new(self.storage.clone(), namespace);
        let mut cart = target.read();
        let items = legacy.len();
        cart.merge(legacy);
        target.write(&cart)?;
        legacy_store.clear()?;

        tracing::info!(items, "Merged legacy cart");
        Ok(MigrationOutcome::Merged { items })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::token_for;
    use crate::session::keys;
    use crate::storage::MemoryStorage;
    use vivero_core::{CartLineItem, Price, ProductId, Quantity, SubjectId};

    struct Fixture {
        storage: Arc<MemoryStorage>,
        migrator: LegacyCartMigrator,
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        let session = SessionNamespace::new(storage.clone(), Arc::new(MemoryStorage::new()));
        Fixture {
            migrator: LegacyCartMigrator::new(session, storage.clone()),
            storage,
        }
    }

    fn log_in(storage: &MemoryStorage, subject: &str) {
        storage
            .set(keys::TOKEN, &token_for(&serde_json::json!({"id": subject})))
            .unwrap();
    }

    fn user_cart(storage: &Arc<MemoryStorage>, subject: &str) -> CartStore {
        CartStore::new(
            storage.clone(),
            Namespace::Subject(SubjectId::new(subject).unwrap()),
        )
    }

    #[test]
    fn test_nothing_to_migrate() {
        let f = fixture();
        log_in(&f.storage, "u1");
        assert_eq!(f.migrator.migrate().unwrap(), MigrationOutcome::NothingToMigrate);

        f.storage.set(keys::LEGACY_CART, "[]").unwrap();
        assert_eq!(f.migrator.migrate().unwrap(), MigrationOutcome::NothingToMigrate);
        assert!(user_cart(&f.storage, "u1").read().is_empty());
    }

    #[test]
    fn test_malformed_legacy_cart_is_left_alone() {
        let f = fixture();
        log_in(&f.storage, "u1");
        f.storage.set(keys::LEGACY_CART, "not json").unwrap();
        assert_eq!(f.migrator.migrate().unwrap(), MigrationOutcome::NothingToMigrate);
        assert!(f.storage.get(keys::LEGACY_CART).is_some());
        assert!(!user_cart(&f.storage, "u1").is_stored());
    }

    #[test]
    fn test_deferred_without_session() {
        let f = fixture();
        f.storage
            .set(keys::LEGACY_CART, r#"[{"id":1,"qty":2}]"#)
            .unwrap();
        for _ in 0..3 {
            assert_eq!(f.migrator.migrate().unwrap(), MigrationOutcome::Deferred);
        }
        assert_eq!(
            f.storage.get(keys::LEGACY_CART).as_deref(),
            Some(r#"[{"id":1,"qty":2}]"#)
        );
    }

    #[test]
    fn test_merge_into_empty_cart_is_idempotent() {
        let f = fixture();
        f.storage
            .set(keys::LEGACY_CART, r#"[{"id":1,"qty":2},{"id":2,"qty":1}]"#)
            .unwrap();
        log_in(&f.storage, "u1");

        assert_eq!(
            f.migrator.migrate().unwrap(),
            MigrationOutcome::Merged { items: 2 }
        );
        assert!(f.storage.get(keys::LEGACY_CART).is_none());
        let cart = user_cart(&f.storage, "u1").read();
        let ids: Vec<_> = cart.items().iter().map(|i| (i.id.as_i64(), i.quantity.get())).collect();
        assert_eq!(ids, vec![(1, 2), (2, 1)]);

        assert_eq!(f.migrator.migrate().unwrap(), MigrationOutcome::NothingToMigrate);
        assert_eq!(user_cart(&f.storage, "u1").read(), cart);
    }

    #[test]
    fn test_merge_sums_existing_lines() {
        let f = fixture();
        log_in(&f.storage, "u1");
        user_cart(&f.storage, "u1")
            .upsert(CartLineItem::new(
                ProductId::new(1),
                "Cactus",
                Price::new(8_000),
                Quantity::new(3),
            ))
            .unwrap();
        f.storage
            .set(keys::LEGACY_CART, r#"[{"id":1,"qty":2}]"#)
            .unwrap();

        f.migrator.migrate().unwrap();
        let cart = user_cart(&f.storage, "u1").read();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity.get(), 5);
        assert_eq!(cart.items()[0].name, "Cactus");
    }

    #[test]
    fn test_merge_normalizes_legacy_fields() {
        let f = fixture();
        log_in(&f.storage, "u1");
        f.storage
            .set(
                keys::LEGACY_CART,
                r#"[{"id":4,"name":"","price":-5,"qty":-3}]"#,
            )
            .unwrap();
        f.migrator.migrate().unwrap();
        let line = user_cart(&f.storage, "u1").read().items()[0].clone();
        assert_eq!(line.name, vivero_core::DEFAULT_ITEM_NAME);
        assert_eq!(line.unit_price, Price::ZERO);
        assert_eq!(line.quantity.get(), 1);
    }
}
