//! Auto-sync watcher against the fake inventory API.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use coffee_inventory::clock::ManualClock;
use coffee_inventory::remote::{build_http_client, DEFAULT_TIMEOUT};
use coffee_inventory::store;
use coffee_inventory::sync::SyncEngine;
use coffee_inventory::watcher::ChangeWatcher;
use tempfile::TempDir;
use tokio::sync::{mpsc, oneshot};

use common::{coffee, inventory, spawn_fake_api, FakeApi};

const COOLDOWN: Duration = Duration::from_secs(3);
const SETTLE: Duration = Duration::from_millis(20);

struct Fixture {
    api: Arc<FakeApi>,
    clock: Arc<ManualClock>,
    watcher: ChangeWatcher,
    _dir: TempDir,
}

async fn fixture() -> Fixture {
    let api = Arc::new(FakeApi::default());
    let url = spawn_fake_api(api.clone()).await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("inventory.json");
    store::save_document(
        &path,
        &inventory(&url, None, vec![coffee("w1", "Watched", 7, 12.0)]),
    )
    .await
    .unwrap();

    let engine = Arc::new(SyncEngine::new(build_http_client(DEFAULT_TIMEOUT).unwrap()));
    let clock = Arc::new(ManualClock::new());
    let watcher = ChangeWatcher::with_timing(&path, engine, COOLDOWN, SETTLE, clock.clone());
    Fixture {
        api,
        clock,
        watcher,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_changes_within_cooldown_sync_once() {
    let mut fx = fixture().await;

    assert!(fx.watcher.on_change());
    fx.clock.advance(Duration::from_millis(800));
    assert!(!fx.watcher.on_change());
    fx.clock.advance(Duration::from_millis(800));
    assert!(!fx.watcher.on_change());

    let summary = fx.watcher.drain().await;
    assert_eq!(summary.events, 3);
    assert_eq!(summary.dropped, 2);
    assert_eq!(summary.syncs(), 1);
    assert_eq!(fx.api.creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_changes_beyond_cooldown_sync_twice() {
    let mut fx = fixture().await;

    assert!(fx.watcher.on_change());
    fx.watcher.drain().await;
    fx.clock.advance(COOLDOWN + Duration::from_millis(1));
    assert!(fx.watcher.on_change());

    let summary = fx.watcher.drain().await;
    assert_eq!(summary.syncs(), 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(fx.api.creates.load(Ordering::SeqCst), 1);
    assert_eq!(fx.api.updates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_sync() {
    let fx = fixture().await;
    let api = fx.api.clone();
    let (tx, rx) = mpsc::channel(8);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(fx.watcher.run_with_events(
        rx,
        async move {
            let _ = stop_rx.await;
        },
        (),
    ));

    tx.send(()).await.unwrap();
    // let the loop pick the event up, then stop before the settle delay ends
    tokio::time::sleep(Duration::from_millis(5)).await;
    stop_tx.send(()).unwrap();

    let summary = handle.await.unwrap();
    assert_eq!(summary.accepted, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(api.stored_count(), 1);
}

#[tokio::test]
async fn test_file_edit_triggers_push() {
    let api = Arc::new(FakeApi::default());
    let url = spawn_fake_api(api.clone()).await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("inventory.json");
    store::save_document(&path, &inventory(&url, None, Vec::new()))
        .await
        .unwrap();

    let engine = Arc::new(SyncEngine::new(build_http_client(DEFAULT_TIMEOUT).unwrap()));
    let watcher = ChangeWatcher::with_timing(
        &path,
        engine,
        Duration::from_millis(100),
        Duration::from_millis(50),
        Arc::new(coffee_inventory::clock::SystemClock),
    );
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(watcher.run(async move {
        let _ = stop_rx.await;
    }));
    tokio::time::sleep(Duration::from_millis(200)).await;

    let edited = inventory(&url, None, vec![coffee("f1", "From File", 2, 11.0)]);
    store::save_document(&path, &edited).await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while api.stored_count() == 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    stop_tx.send(()).unwrap();
    let summary = handle.await.unwrap().unwrap();

    assert_eq!(api.stored_count(), 1);
    assert!(summary.syncs() >= 1);
}

#[tokio::test]
async fn test_edit_during_slow_push_is_pushed_next() {
    // each request takes 300 ms, so the first push (GET + POST) is still
    // running when the second change is accepted
    let api = Arc::new(FakeApi::slow(300));
    let url = spawn_fake_api(api.clone()).await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("inventory.json");
    store::save_document(
        &path,
        &inventory(&url, None, vec![coffee("w1", "Old Name", 7, 12.0)]),
    )
    .await
    .unwrap();

    let engine = Arc::new(SyncEngine::new(build_http_client(DEFAULT_TIMEOUT).unwrap()));
    let clock = Arc::new(ManualClock::new());
    let mut watcher = ChangeWatcher::with_timing(&path, engine, COOLDOWN, SETTLE, clock.clone());

    assert!(watcher.on_change());
    tokio::time::sleep(Duration::from_millis(100)).await;

    store::save_document(
        &path,
        &inventory(&url, None, vec![coffee("w1", "New Name", 7, 12.0)]),
    )
    .await
    .unwrap();
    clock.advance(Duration::from_secs(4));
    assert!(watcher.on_change());

    let summary = watcher.drain().await;
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(api.creates.load(Ordering::SeqCst), 1);
    assert_eq!(api.updates.load(Ordering::SeqCst), 1);
    assert_eq!(api.stored_name("w1").as_deref(), Some("New Name"));
}
