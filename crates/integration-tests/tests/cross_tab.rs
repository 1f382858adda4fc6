//! Integration tests for session changes propagating between tabs.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use vivero_core::{CartLineItem, Price, ProductId, Quantity};
use vivero_integration_tests::{FakeWishlist, raw_token, tab_context, token_for_subject};
use vivero_storefront::StorefrontContext;
use vivero_storefront::config::StorefrontConfig;
use vivero_storefront::session::keys;
use vivero_storefront::storage::{FileStorage, MemoryStorage, SharedStorageArea, Storage};
use vivero_storefront::sync::{CrossTabSynchronizer, spawn_file_watcher};
use vivero_storefront::views::SessionSnapshot;

const TIMEOUT: Duration = Duration::from_secs(5);

async fn wait_until(
    rx: &mut watch::Receiver<SessionSnapshot>,
    predicate: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    tokio::time::timeout(TIMEOUT, rx.wait_for(predicate))
        .await
        .unwrap()
        .unwrap()
        .clone()
}

#[tokio::test]
async fn test_sign_in_and_out_reach_other_tab() {
    let area = SharedStorageArea::new();
    let tab_a = Arc::new(area.open_tab());
    let tab_b = Arc::new(area.open_tab());
    let api = Arc::new(FakeWishlist::with_items(&[(1, 4), (2, 0)]));

    let ctx_a = tab_context(tab_a.clone(), Arc::new(MemoryStorage::new()), &api);
    let ctx_b = tab_context(tab_b.clone(), Arc::new(MemoryStorage::new()), &api);
    let _sync = CrossTabSynchronizer::new(ctx_b.clone(), tab_b.subscribe()).spawn();
    let mut snapshots = ctx_b.subscribe();

    ctx_a.sign_in(&token_for_subject("maria")).await.unwrap();
    let snapshot = wait_until(&mut snapshots, |s| s.navbar.signed_in).await;
    assert_eq!(snapshot.navbar.display_name, "maria");
    assert_eq!(snapshot.navbar.initial, 'M');
    assert_eq!(snapshot.badges.wishlist, 2);

    ctx_a.sign_out().await.unwrap();
    let snapshot = wait_until(&mut snapshots, |s| !s.navbar.signed_in).await;
    assert_eq!(snapshot, SessionSnapshot::default());
}

#[tokio::test]
async fn test_cart_change_updates_other_tab_badge() {
    let area = SharedStorageArea::new();
    let tab_a = Arc::new(area.open_tab());
    let tab_b = Arc::new(area.open_tab());
    tab_a.set(keys::TOKEN, &raw_token("u1")).unwrap();
    let api = Arc::new(FakeWishlist::default());

    let ctx_a = tab_context(tab_a.clone(), Arc::new(MemoryStorage::new()), &api);
    let ctx_b = tab_context(tab_b.clone(), Arc::new(MemoryStorage::new()), &api);
    ctx_b.rehydrate();
    let _sync = CrossTabSynchronizer::new(ctx_b.clone(), tab_b.subscribe()).spawn();
    let mut snapshots = ctx_b.subscribe();

    ctx_a
        .add_to_cart(CartLineItem::new(ProductId::new(9), "Monstera", Price::new(40_000), Quantity::new(2)))
        .unwrap();
    let snapshot = wait_until(&mut snapshots, |s| s.badges.cart == 2).await;
    assert_eq!(snapshot.cart.total(), Price::new(80_000));
}

#[tokio::test]
async fn test_guest_cart_from_other_tab_is_merged_by_signed_in_tab() {
    let area = SharedStorageArea::new();
    let tab_a = Arc::new(area.open_tab());
    let tab_b = Arc::new(area.open_tab());
    let api = Arc::new(FakeWishlist::default());

    // Tab B holds a tab-scoped session only; tab A has none
    let session_b = Arc::new(MemoryStorage::new());
    session_b.set(keys::TOKEN, &raw_token("u7")).unwrap();
    let ctx_a = tab_context(tab_a.clone(), Arc::new(MemoryStorage::new()), &api);
    let ctx_b = tab_context(tab_b.clone(), session_b, &api);
    let _sync = CrossTabSynchronizer::new(ctx_b.clone(), tab_b.subscribe()).spawn();
    let mut snapshots = ctx_b.subscribe();

    ctx_a
        .add_to_guest_cart(CartLineItem::new(ProductId::new(3), "Aloe", Price::new(9_000), Quantity::ONE))
        .unwrap();
    wait_until(&mut snapshots, |s| s.badges.cart == 1).await;

    assert!(tab_a.get(keys::LEGACY_CART).is_none());
    assert!(tab_a.get("lc_cart_u7").is_some());
}

#[tokio::test]
async fn test_file_watcher_carries_sign_in_between_processes() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorefrontConfig {
        storage_dir: dir.path().to_path_buf(),
        ..StorefrontConfig::default()
    };
    let api = Arc::new(FakeWishlist::with_items(&[(5, 2)]));
    let open = |tab: &str| {
        StorefrontContext::new(
            config.clone(),
            Arc::new(FileStorage::new(config.persistent_storage_path())),
            Arc::new(FileStorage::new(config.tab_storage_path(tab))),
            Arc::clone(&api),
        )
    };
    let writer = open("writer");
    let reader = open("reader");

    let (events, _watcher) = spawn_file_watcher(
        FileStorage::new(config.persistent_storage_path()),
        Duration::from_millis(10),
    );
    let _sync = CrossTabSynchronizer::new(reader.clone(), events).spawn();
    let mut snapshots = reader.subscribe();

    writer.sign_in(&token_for_subject("luz")).await.unwrap();
    let snapshot = wait_until(&mut snapshots, |s| s.navbar.signed_in).await;
    assert_eq!(snapshot.navbar.display_name, "luz");
    assert_eq!(snapshot.badges.wishlist, 1);
}
