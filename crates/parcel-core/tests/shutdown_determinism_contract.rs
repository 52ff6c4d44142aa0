//! Architectural Contract Test: Shutdown Determinism
//!
//! Constraints verified:
//! - The monitor terminates on shutdown signal
//! - State is flushed exactly once before exit
//! - A poll in progress does not delay shutdown
//! - A tracker without a monitor returns immediately

mod common;

use common::*;
use parcel_core::{MonitorEvent, Tracker};
use std::time::Duration;

#[tokio::test]
async fn shutdown_signal_terminates_monitor() {
    let fetcher = ScriptedFetcher::page(delivered_page());
    let (tracker, mut event_rx) = Tracker::new(
        Box::new(fetcher),
        Box::new(CountingStateStore::new()),
        RecordingNotifier::new(),
        monitor_config(),
    )
    .expect("tracker construction succeeds");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { tracker.run_with_shutdown(Some(shutdown_rx)).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(result.is_ok(), "Monitor should terminate within 5 seconds");
    assert!(result.unwrap().unwrap().is_ok());

    let mut saw_started = false;
    let mut saw_stopped = false;
    while let Ok(event) = event_rx.try_recv() {
        match event {
            MonitorEvent::Started { .. } => saw_started = true,
            MonitorEvent::Stopped { .. } => saw_stopped = true,
            _ => {}
        }
    }
    assert!(saw_started && saw_stopped);
}

#[tokio::test]
async fn shutdown_flushes_state() {
    let store = CountingStateStore::new();
    let (tracker, _event_rx) = Tracker::new(
        Box::new(ScriptedFetcher::page(delivered_page())),
        Box::new(CountingStateStore::sharing_counters_with(&store)),
        RecordingNotifier::new(),
        monitor_config(),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { tracker.run_with_shutdown(Some(shutdown_rx)).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();

    assert_eq!(
        store.flush_call_count(),
        1,
        "StateStore::flush() should be called exactly once on shutdown"
    );
    assert!(store.stored("861396533622_6719").is_some(), "first poll runs immediately");
}

#[tokio::test]
async fn tracker_without_monitor_returns_immediately() {
    let fetcher = ScriptedFetcher::page(delivered_page());
    let (tracker, _event_rx) = Tracker::new(
        Box::new(ScriptedFetcher::sharing_script_with(&fetcher)),
        Box::new(CountingStateStore::new()),
        RecordingNotifier::new(),
        minimal_config(),
    )
    .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(1), tracker.run()).await;

    assert!(matches!(result, Ok(Ok(()))));
    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test]
async fn shutdown_interrupts_a_hanging_poll() {
    let store = CountingStateStore::new();
    let fetcher = ScriptedFetcher::new(vec![Step::Hang]);
    let (tracker, mut event_rx) = Tracker::new(
        Box::new(ScriptedFetcher::sharing_script_with(&fetcher)),
        Box::new(CountingStateStore::sharing_counters_with(&store)),
        RecordingNotifier::new(),
        monitor_config(),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { tracker.run_with_shutdown(Some(shutdown_rx)).await });

    // Each attempt is bounded at 5s; the poll is still running here
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fetcher.call_count(), 1);
    shutdown_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
    assert!(result.is_ok(), "Monitor should not wait for the poll to finish");
    assert!(result.unwrap().unwrap().is_ok());

    assert_eq!(store.flush_call_count(), 1);
    assert!(store.stored("861396533622_6719").is_none());

    let mut saw_stopped = false;
    while let Ok(event) = event_rx.try_recv() {
        if matches!(event, MonitorEvent::Stopped { .. }) {
            saw_stopped = true;
        }
    }
    assert!(saw_stopped);
}
