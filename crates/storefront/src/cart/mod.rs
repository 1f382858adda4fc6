//! Cart persistence and the pre-login cart migration.

mod migrate;
mod store;

pub use migrate::{LegacyCartMigrator, MigrationOutcome};
pub use store::{CartStore, CartTarget};
