//! Key/value storage backing the session token and carts.
//!
//! Two scopes exist, mirroring what a browser offers:
//!
//! - persistent storage, shared by every tab of the same origin
//! - tab-scoped storage, private to one tab
//!
//! Both are plain string maps behind the [`Storage`] trait. Writes to shared
//! persistent storage produce [`StorageEvent`]s that other tabs observe.
//!
//! There is no transaction support. Callers that read-modify-write a key race
//! with other tabs doing the same, and the last writer wins.

mod file;
mod memory;

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use thiserror::Error;

pub use file::FileStorage;
pub use memory::{MemoryStorage, SharedStorageArea, TabId, TabStorage};

/// Errors raised when writing to storage.
///
/// Reads never fail: missing or unreadable data reads as absent.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be serialized.
    #[error("storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A lock guarding the storage was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// A string key/value store.
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion cannot be persisted.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Notification that a key changed in shared storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// The key that changed.
    pub key: String,
    /// The value after the change, `None` if the key was removed.
    pub new_value: Option<String>,
}

impl StorageEvent {
    /// Event for a key that was set.
    #[must_use]
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            new_value: Some(value.into()),
        }
    }

    /// Event for a key that was removed.
    #[must_use]
    pub fn removed(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            new_value: None,
        }
    }
}

/// Read and deserialize a JSON value.
///
/// Absent keys and unparseable values both yield `None`; the latter is logged.
pub fn read_json<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let raw = storage.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "Ignoring unparseable stored value");
            None
        }
    }
}

/// Compute the events that turn `old` into `new`, in key order.
#[must_use]
pub fn diff_snapshots(
    old: &HashMap<String, String>,
    new: &HashMap<String, String>,
) -> Vec<StorageEvent> {
    let mut events: Vec<StorageEvent> = new
        .iter()
        .filter(|(key, value)| old.get(*key) != Some(*value))
        .map(|(key, value)| StorageEvent::set(key.clone(), value.clone()))
        .chain(
            old.keys()
                .filter(|key| !new.contains_key(*key))
                .map(|key| StorageEvent::removed(key.clone())),
        )
        .collect();
    events.sort_by(|a, b| a.key.cmp(&b.key));
    events
}
