//! Cross-tab synchronization.
//!
//! Storage changes made by other tabs arrive as [`StorageEvent`]s. Each
//! relevant event re-runs the legacy cart migration and republishes the
//! session snapshot; nothing is patched in place from the event payload.
//!
//! Handlers are idempotent. A burst of events simply recomputes the same
//! snapshot several times.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::context::StorefrontContext;
use crate::session::keys;
use crate::storage::{FileStorage, StorageEvent, diff_snapshots};
use crate::views::SessionSnapshot;
use crate::wishlist::WishlistApi;

/// Capacity of the file watcher's event channel.
const WATCHER_CAPACITY: usize = 256;

/// Re-derives session state whenever shared storage changes elsewhere.
pub struct CrossTabSynchronizer<A> {
    context: StorefrontContext<A>,
    events: broadcast::Receiver<StorageEvent>,
}

impl<A> std::fmt::Debug for CrossTabSynchronizer<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossTabSynchronizer")
            .field("pending", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl<A: WishlistApi> CrossTabSynchronizer<A> {
    /// Synchronize `context` from a stream of storage events.
    #[must_use]
    pub const fn new(context: StorefrontContext<A>, events: broadcast::Receiver<StorageEvent>) -> Self {
        Self { context, events }
    }

    /// React to one storage event.
    ///
    /// Returns the republished snapshot, or `None` if the key is unrelated to
    /// the session or carts. A token change also refreshes the favorites,
    /// since they belong to whoever is signed in now.
    pub async fn handle(&self, event: &StorageEvent) -> Option<SessionSnapshot> {
        if !keys::is_session_relevant(&event.key) {
            return None;
        }
        debug!(key = %event.key, removed = event.new_value.is_none(), "Storage changed in another tab");

        if event.key == keys::TOKEN {
            Some(self.context.reload().await)
        } else {
            Some(self.context.rehydrate())
        }
    }

    /// Process events until every sender is gone.
    ///
    /// A lagged receiver has missed events it cannot replay, so everything is
    /// rehydrated from storage instead.
    pub async fn run(mut self) {
        loop {
            match self.events.recv().await {
                Ok(event) => {
                    self.handle(&event).await;
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Storage events lagged, rehydrating from storage");
                    self.context.reload().await;
                }
                Err(RecvError::Closed) => {
                    debug!("Storage event channel closed");
                    break;
                }
            }
        }
    }

    /// Spawn [`Self::run`] on the current runtime.
    pub fn spawn(self) -> JoinHandle<()>
    where
        A: 'static,
    {
        tokio::spawn(self.run())
    }
}

/// Poll a [`FileStorage`] and publish a [`StorageEvent`] per changed key.
///
/// This is the cross-process counterpart of an in-memory shared area: every
/// process pointed at the same file sees the others' writes within one
/// `interval`. Its own writes are reported too, which the idempotent
/// handlers tolerate. The task stops once every receiver is dropped.
pub fn spawn_file_watcher(
    storage: FileStorage,
    interval: Duration,
) -> (broadcast::Receiver<StorageEvent>, JoinHandle<()>) {
    let (tx, rx) = broadcast::channel(WATCHER_CAPACITY);
    let mut last = storage.snapshot();

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let reader = storage.clone();
            let current = match tokio::task::spawn_blocking(move || reader.snapshot()).await {
                Ok(current) => current,
                Err(e) => {
                    warn!(error = %e, "Storage poll task failed");
                    continue;
                }
            };

            for event in diff_snapshots(&last, &current) {
                if tx.send(event).is_err() {
                    debug!(path = %storage.path().display(), "No subscribers left, stopping watcher");
                    return;
                }
            }
            if tx.receiver_count() == 0 {
                return;
            }
            last = current;
        }
    });

    (rx, handle)
}
