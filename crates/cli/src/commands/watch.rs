//! Follow storage changes made by other tabs.
//!
//! Polls the persistent storage file and prints the badges whenever the
//! published snapshot changes. Stops on Ctrl-C.

use std::time::Duration;

use vivero_storefront::StorefrontContext;
use vivero_storefront::storage::FileStorage;
use vivero_storefront::sync::{CrossTabSynchronizer, spawn_file_watcher};

use super::{CliError, badges_line, print_line};

pub async fn run(ctx: &StorefrontContext, interval: Duration) -> Result<(), CliError> {
    let storage = FileStorage::new(ctx.config().persistent_storage_path());
    let (events, watcher) = spawn_file_watcher(storage, interval);
    let sync = CrossTabSynchronizer::new(ctx.clone(), events).spawn();

    // Changes published during the reload still wake the loop
    let mut snapshots = ctx.subscribe();
    snapshots.mark_unchanged();
    ctx.reload().await;
    print_line(&badges_line(&snapshots.borrow_and_update()));

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let line = badges_line(&snapshots.borrow_and_update());
                print_line(&line);
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("Stopping watch");
                break;
            }
        }
    }

    sync.abort();
    watcher.abort();
    Ok(())
}
