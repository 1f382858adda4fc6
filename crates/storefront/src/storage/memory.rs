//! In-memory storage.
//!
//! [`MemoryStorage`] is a private map, used for tab-scoped storage.
//! [`SharedStorageArea`] is one map shared by any number of [`TabStorage`]
//! handles; each write fans a [`StorageEvent`] out to every *other* tab.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::broadcast;

use super::{Storage, StorageError, StorageEvent};

/// Capacity of each tab's notification channel.
const TAB_EVENT_CAPACITY: usize = 256;

/// A private in-memory map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .map_err(|_| StorageError::Poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .map_err(|_| StorageError::Poisoned)?
            .remove(key);
        Ok(())
    }
}

/// Identifier of a tab attached to a [`SharedStorageArea`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(u64);

/// Storage shared by every tab of one origin.
#[derive(Clone, Default)]
pub struct SharedStorageArea {
    inner: Arc<AreaInner>,
}

#[derive(Default)]
struct AreaInner {
    entries: RwLock<HashMap<String, String>>,
    tabs: Mutex<Vec<(TabId, broadcast::Sender<StorageEvent>)>>,
    next_tab: AtomicU64,
}

impl std::fmt::Debug for SharedStorageArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tabs = self.inner.tabs.lock().map(|t| t.len()).unwrap_or_default();
        f.debug_struct("SharedStorageArea")
            .field("tabs", &tabs)
            .finish_non_exhaustive()
    }
}

impl SharedStorageArea {
    /// Create an empty area with no tabs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new tab to this area.
    #[must_use]
    pub fn open_tab(&self) -> TabStorage {
        let id = TabId(self.inner.next_tab.fetch_add(1, Ordering::Relaxed));
        let (sender, _) = broadcast::channel(TAB_EVENT_CAPACITY);
        if let Ok(mut tabs) = self.inner.tabs.lock() {
            tabs.push((id, sender.clone()));
        }
        tracing::debug!(tab = id.0, "Tab attached to shared storage");
        TabStorage {
            area: self.clone(),
            id,
            events: sender,
        }
    }

    /// Notify every tab except `origin`.
    fn notify(&self, origin: TabId, event: &StorageEvent) {
        let Ok(tabs) = self.inner.tabs.lock() else {
            return;
        };
        for (tab, sender) in tabs.iter().filter(|(tab, _)| *tab != origin) {
            // No receivers is fine: the tab is not listening.
            if sender.send(event.clone()).is_err() {
                tracing::trace!(tab = tab.0, key = %event.key, "Tab has no storage listeners");
            }
        }
    }

    fn detach(&self, id: TabId) {
        if let Ok(mut tabs) = self.inner.tabs.lock() {
            tabs.retain(|(tab, _)| *tab != id);
        }
    }

    fn write(&self, origin: TabId, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        let changed = {
            let mut entries = self
                .inner
                .entries
                .write()
                .map_err(|_| StorageError::Poisoned)?;
            match value {
                Some(value) => {
                    entries.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
                }
                None => entries.remove(key).is_some(),
            }
        };

        // Like the browser, unchanged values do not notify.
        if changed {
            let event = StorageEvent {
                key: key.to_string(),
                new_value: value.map(str::to_string),
            };
            self.notify(origin, &event);
        }
        Ok(())
    }
}

/// One tab's handle onto a [`SharedStorageArea`].
pub struct TabStorage {
    area: SharedStorageArea,
    id: TabId,
    events: broadcast::Sender<StorageEvent>,
}

impl std::fmt::Debug for TabStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabStorage").field("id", &self.id).finish_non_exhaustive()
    }
}

impl TabStorage {
    /// This tab's id.
    #[must_use]
    pub const fn id(&self) -> TabId {
        self.id
    }

    /// Receive changes made by other tabs.
    ///
    /// Changes made through this handle are not delivered here.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}

impl Drop for TabStorage {
    fn drop(&mut self) {
        self.area.detach(self.id);
    }
}

impl Storage for TabStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.area.inner.entries.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.area.write(self.id, key, Some(value))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.area.write(self.id, key, None)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("k"), None);
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").as_deref(), Some("v"));
        storage.remove("k").unwrap();
        assert_eq!(storage.get("k"), None);
    }

    #[test]
    fn test_tabs_share_entries() {
        let area = SharedStorageArea::new();
        let a = area.open_tab();
        let b = area.open_tab();
        a.set("token", "t1").unwrap();
        assert_eq!(b.get("token").as_deref(), Some("t1"));
    }

    #[test]
    fn test_events_reach_other_tabs_only() {
        let area = SharedStorageArea::new();
        let a = area.open_tab();
        let b = area.open_tab();
        let mut a_events = a.subscribe();
        let mut b_events = b.subscribe();

        a.set("token", "t1").unwrap();

        assert_eq!(b_events.try_recv().unwrap(), StorageEvent::set("token", "t1"));
        assert!(a_events.try_recv().is_err());
    }

    #[test]
    fn test_unchanged_write_does_not_notify() {
        let area = SharedStorageArea::new();
        let a = area.open_tab();
        let b = area.open_tab();
        a.set("k", "v").unwrap();
        let mut b_events = b.subscribe();

        a.set("k", "v").unwrap();
        a.remove("missing").unwrap();
        assert!(b_events.try_recv().is_err());

        a.remove("k").unwrap();
        assert_eq!(b_events.try_recv().unwrap(), StorageEvent::removed("k"));
    }

    #[test]
    fn test_dropped_tab_detaches() {
        let area = SharedStorageArea::new();
        let a = area.open_tab();
        {
            let _b = area.open_tab();
        }
        assert_eq!(area.inner.tabs.lock().unwrap().len(), 1);
        drop(a);
        assert!(area.inner.tabs.lock().unwrap().is_empty());
    }
}
