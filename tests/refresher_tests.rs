mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeSource, auth_error};
use immich_slideshow::events::RefreshTrigger;
use immich_slideshow::slideshow::{Coordinator, RefreshHealth, SlideshowOptions};
use immich_slideshow::tasks::refresher::{self, RefreshSchedule};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

const TICK: Duration = Duration::from_millis(50);

fn schedule(auto_advance: bool) -> RefreshSchedule {
    RefreshSchedule {
        interval: TICK,
        auto_advance,
    }
}

async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(3), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timeout waiting for {what}"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timed_refresh_picks_up_changes_and_advances() {
    let source = Arc::new(FakeSource::with_assets(&["A", "B", "C"]));
    let c = Coordinator::new(source.clone(), SlideshowOptions::default());
    c.refresh(RefreshTrigger::Startup).await.unwrap();
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(refresher::run(c.clone(), schedule(true), cancel.clone()));

    eventually("auto-advance", || c.index() != 0).await;
    assert!(source.fetches() >= 2);

    source.set_assets(&["A", "B", "C", "D"]);
    eventually("grown list", || c.count() == 4).await;

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn disabled_auto_advance_only_refreshes() {
    let source = Arc::new(FakeSource::with_assets(&["A", "B", "C"]));
    let c = Coordinator::new(source.clone(), SlideshowOptions::default());
    c.refresh(RefreshTrigger::Startup).await.unwrap();
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(refresher::run(c.clone(), schedule(false), cancel.clone()));
    source.wait_for_fetches(4).await;
    assert_eq!(c.index(), 0);

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn browsing_history_pauses_auto_advance() {
    let source = Arc::new(FakeSource::with_assets(&["A", "B", "C"]));
    let c = Coordinator::new(source.clone(), SlideshowOptions::default());
    c.refresh(RefreshTrigger::Startup).await.unwrap();
    c.advance();
    c.advance();
    c.previous();
    assert_eq!(c.current().map(|a| a.id).as_deref(), Some("B"));
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(refresher::run(c.clone(), schedule(true), cancel.clone()));
    source.wait_for_fetches(4).await;

    let snapshot = c.snapshot();
    assert!(!snapshot.in_live_mode);
    assert_eq!(snapshot.current.map(|a| a.id).as_deref(), Some("B"));
    assert_eq!(snapshot.index, 2);

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failures_do_not_stop_the_loop() {
    let source = Arc::new(FakeSource::with_assets(&["A"]));
    source.push_failure(auth_error());
    source.push_failure(auth_error());
    let c = Coordinator::new(source.clone(), SlideshowOptions::default());
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(refresher::run(c.clone(), schedule(false), cancel.clone()));
    eventually("recovery", || c.snapshot().health == RefreshHealth::Healthy).await;
    assert!(source.fetches() >= 3);
    assert!(c.is_available());

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_interrupts_a_blocked_refresh() {
    let gate = Arc::new(Semaphore::new(0));
    let source = Arc::new(FakeSource::with_assets(&["A"]).gated(gate));
    let c = Coordinator::new(source.clone(), SlideshowOptions::default());
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(refresher::run(c.clone(), schedule(true), cancel.clone()));
    source.wait_for_fetches(1).await;
    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("refresh task did not exit")
        .unwrap()
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_ends_the_started_task() {
    let source = Arc::new(FakeSource::with_assets(&["A", "B"]));
    let c = Coordinator::new(source.clone(), SlideshowOptions::default());
    c.refresh(RefreshTrigger::Startup).await.unwrap();

    let handle = c.start(schedule(true));
    source.wait_for_fetches(2).await;
    c.stop();

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("refresh task did not exit after stop")
        .unwrap()
        .unwrap();
}
