//! Architectural Contract Test: Interactive Lookup
//!
//! Constraints verified:
//! - A successful lookup replies with every event, newest first
//! - Every terminal outcome produces a reply (never silence)
//! - Retries happen only for timeouts and network failures
//! - The Tracker bounds a fetch that never completes

mod common;

use common::*;
use parcel_core::config::{ProviderConfig, RetryConfig};
use parcel_core::format::{EMPTY_TEXT, NOT_FOUND_TEXT, TIMEOUT_TEXT};
use parcel_core::{FetchOutcome, StatusEvent, Tracker, TrackerConfig};
use std::time::Duration;

fn tracker_with(fetcher: &ScriptedFetcher, config: TrackerConfig) -> (Tracker, CountingStateStore) {
    let store = CountingStateStore::new();
    let (tracker, _event_rx) = Tracker::new(
        Box::new(ScriptedFetcher::sharing_script_with(fetcher)),
        Box::new(CountingStateStore::sharing_counters_with(&store)),
        RecordingNotifier::new(),
        config,
    )
    .expect("tracker construction succeeds");
    (tracker, store)
}

#[tokio::test]
async fn successful_lookup_lists_events_newest_first() {
    let fetcher = ScriptedFetcher::page(delivered_page());
    let (tracker, _store) = tracker_with(&fetcher, minimal_config());

    let reply = tracker
        .handle_command("/check 861396533622 6719")
        .await
        .unwrap();

    assert_eq!(
        reply,
        "📦 Order: 861396533622\n\
         01/01/2024 10:00: Delivered\n\
         31/12/2023 18:00: Out for delivery"
    );
    assert_eq!(fetcher.call_count(), 1);
}

#[tokio::test]
async fn lookup_result_carries_source_url_and_events() {
    let fetcher = ScriptedFetcher::page(delivered_page());
    let (tracker, _store) = tracker_with(&fetcher, minimal_config());

    let result = tracker.lookup(&query()).await;

    assert_eq!(result.outcome, FetchOutcome::Success);
    assert_eq!(
        result.source_url,
        "https://jtexpress.test/tracking?billcode=861396533622"
    );
    assert_eq!(
        result.latest(),
        Some(&StatusEvent::new("01/01/2024 10:00", "Delivered"))
    );
}

#[tokio::test]
async fn interactive_lookup_records_latest_status() {
    let fetcher = ScriptedFetcher::page(delivered_page());
    let (tracker, store) = tracker_with(&fetcher, minimal_config());

    tracker.handle_command("/check 861396533622 6719").await;
    tracker.handle_command("/check 861396533622 6719").await;

    assert_eq!(
        store.stored("861396533622_6719").as_deref(),
        Some("01/01/2024 10:00|Delivered")
    );
    assert_eq!(store.set_call_count(), 1, "identical status is written once");
}

#[tokio::test]
async fn empty_status_list_gets_its_own_reply() {
    let fetcher = ScriptedFetcher::page(tracking_page(&[]));
    let (tracker, store) = tracker_with(&fetcher, minimal_config());

    let reply = tracker.handle_command("/check 861396533622 6719").await;

    assert_eq!(reply.as_deref(), Some(EMPTY_TEXT));
    assert_eq!(store.set_call_count(), 0);
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let fetcher = ScriptedFetcher::new(vec![Step::NotFound]);
    let (tracker, _store) = tracker_with(&fetcher, minimal_config());

    let reply = tracker.handle_command("/check 861396533622 6719").await;

    assert_eq!(reply.as_deref(), Some(NOT_FOUND_TEXT));
    assert_eq!(fetcher.call_count(), 1);
}

#[tokio::test]
async fn timeout_is_retried_then_reported() {
    let fetcher = ScriptedFetcher::new(vec![Step::Timeout]);
    let (tracker, _store) = tracker_with(&fetcher, minimal_config());

    let reply = tracker.handle_command("/check 861396533622 6719").await;

    assert_eq!(reply.as_deref(), Some(TIMEOUT_TEXT));
    assert_eq!(fetcher.call_count(), 2, "one retry with a fresh attempt");
}

#[tokio::test]
async fn transient_failure_recovers_on_retry() {
    let fetcher = ScriptedFetcher::new(vec![Step::Transient, Step::Page(delivered_page())]);
    let (tracker, _store) = tracker_with(&fetcher, minimal_config());

    let result = tracker.lookup(&query()).await;

    assert!(result.is_success());
    assert_eq!(fetcher.call_count(), 2);
}

#[tokio::test]
async fn exhausted_network_failures_reply_with_bounded_detail() {
    let fetcher = ScriptedFetcher::new(vec![Step::Transient]);
    let (tracker, _store) = tracker_with(&fetcher, minimal_config());

    let reply = tracker
        .handle_command("/check 861396533622 6719")
        .await
        .unwrap();

    assert!(reply.starts_with("Could not load the tracking page."));
    assert!(reply.contains("connection reset by peer"));
    assert_eq!(fetcher.call_count(), 2);
}

#[tokio::test]
async fn hanging_fetch_is_bounded_by_the_tracker() {
    let fetcher = ScriptedFetcher::new(vec![Step::Hang]);
    let config = TrackerConfig {
        provider: ProviderConfig::new("https://jtexpress.test/tracking?billcode={billcode}", 1),
        retry: RetryConfig {
            max_attempts: 1,
            retry_delay_secs: 0,
        },
        ..minimal_config()
    };
    let (tracker, _store) = tracker_with(&fetcher, config);

    let reply = tokio::time::timeout(
        Duration::from_secs(5),
        tracker.handle_command("/check 861396533622 6719"),
    )
    .await
    .expect("lookup finishes within the configured bound");

    assert_eq!(reply.as_deref(), Some(TIMEOUT_TEXT));
}
