//! Test doubles and common utilities for contract tests
//!
//! Minimal fetcher, notifier and state store doubles that count calls so the
//! tests can verify how the Tracker drives its collaborators.

#![allow(dead_code)]

use parcel_core::config::{MessageConfig, ProviderConfig, RetryConfig, TrackerConfig};
use parcel_core::error::{Error, Result};
use parcel_core::model::{RawContent, TrackingQuery};
use parcel_core::traits::{Notifier, PageFetcher, StateStore};
use parcel_core::MonitorConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BILLCODE: &str = "861396533622";
pub const PHONE: &str = "6719";
pub const CHAT_ID: &str = "123456789";

/// One scripted fetch result
#[derive(Debug, Clone)]
pub enum Step {
    /// Return this page
    Page(String),
    NotFound,
    Timeout,
    Transient,
    /// Never complete (exercises the Tracker's wall-clock bound)
    Hang,
}

/// A fetcher that replays a script, repeating the last step once exhausted
pub struct ScriptedFetcher {
    steps: Arc<Mutex<VecDeque<Step>>>,
    last: Arc<Mutex<Step>>,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedFetcher {
    pub fn new(steps: Vec<Step>) -> Self {
        let last = steps.last().cloned().unwrap_or(Step::NotFound);
        Self {
            steps: Arc::new(Mutex::new(steps.into())),
            last: Arc::new(Mutex::new(last)),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always return `html`
    pub fn page(html: impl Into<String>) -> Self {
        Self::new(vec![Step::Page(html.into())])
    }

    /// Get the number of times fetch() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Queue more steps (applies to fetchers sharing this script)
    pub fn push(&self, step: Step) {
        *self.last.lock().unwrap() = step.clone();
        self.steps.lock().unwrap().push_back(step);
    }

    /// Create a fetcher that shares script and counters with an existing one
    pub fn sharing_script_with(other: &Self) -> Self {
        Self {
            steps: Arc::clone(&other.steps),
            last: Arc::clone(&other.last),
            call_count: Arc::clone(&other.call_count),
        }
    }
}

#[async_trait::async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, query: &TrackingQuery) -> Result<RawContent> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let step = {
            let mut steps = self.steps.lock().unwrap();
            match steps.pop_front() {
                Some(step) => step,
                None => self.last.lock().unwrap().clone(),
            }
        };

        match step {
            Step::Page(html) => Ok(RawContent::new(html, "https://jtexpress.test/tracking")),
            Step::NotFound => Err(Error::not_found(query.billcode())),
            Step::Timeout => Err(Error::timeout("page never became ready")),
            Step::Transient => Err(Error::transient("connection reset by peer")),
            Step::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}

/// A notifier that records every delivered message
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        })
    }

    /// A notifier whose deliveries all fail
    pub fn failing() -> Arc<Self> {
        let notifier = Self::new();
        notifier.set_failing(true);
        notifier
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// (destination, text) pairs in delivery order
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, destination: &str, text: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::delivery("chat not found"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), text.to_string()));
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "recording"
    }
}

/// A state store that counts flushes
pub struct CountingStateStore {
    state: Arc<Mutex<HashMap<String, String>>>,
    set_call_count: Arc<AtomicUsize>,
    flush_call_count: Arc<AtomicUsize>,
}

impl CountingStateStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
            set_call_count: Arc::new(AtomicUsize::new(0)),
            flush_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_call_count(&self) -> usize {
        self.set_call_count.load(Ordering::SeqCst)
    }

    pub fn flush_call_count(&self) -> usize {
        self.flush_call_count.load(Ordering::SeqCst)
    }

    pub fn stored(&self, key: &str) -> Option<String> {
        self.state.lock().unwrap().get(key).cloned()
    }

    /// Create a store that shares state and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            state: Arc::clone(&other.state),
            set_call_count: Arc::clone(&other.set_call_count),
            flush_call_count: Arc::clone(&other.flush_call_count),
        }
    }
}

#[async_trait::async_trait]
impl StateStore for CountingStateStore {
    async fn get_status(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().get(key).cloned())
    }

    async fn set_status(&self, key: &str, status: &str) -> Result<()> {
        self.set_call_count.fetch_add(1, Ordering::SeqCst);
        self.state
            .lock()
            .unwrap()
            .insert(key.to_string(), status.to_string());
        Ok(())
    }

    async fn delete_status(&self, key: &str) -> Result<()> {
        self.state.lock().unwrap().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().unwrap().keys().cloned().collect())
    }

    async fn flush(&self) -> Result<()> {
        self.flush_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// One status entry in the courier's markup (time label precedes date)
pub fn entry_html(time: &str, date: &str, description: &str) -> String {
    format!(
        r#"<div class="result-vandon-item">
            <div><span class="SFProDisplayBold">{}</span> <span class="SFProDisplayBold">{}</span></div>
            <div>{}</div>
        </div>"#,
        time, date, description
    )
}

/// A full tracking page holding `entries`, newest first
pub fn tracking_page(entries: &[(&str, &str, &str)]) -> String {
    let items: String = entries
        .iter()
        .map(|(time, date, desc)| entry_html(time, date, desc))
        .collect();
    format!(
        r#"<html><body><div class="result-vandon">{}</div></body></html>"#,
        items
    )
}

/// Tracking page with a single "Delivered" event
pub fn delivered_page() -> String {
    tracking_page(&[
        ("10:00", "01/01/2024", "Delivered"),
        ("18:00", "31/12/2023", "Out for delivery"),
    ])
}

pub fn query() -> TrackingQuery {
    TrackingQuery::new(BILLCODE, PHONE).unwrap()
}

/// Helper to create a minimal TrackerConfig for testing
pub fn minimal_config() -> TrackerConfig {
    TrackerConfig {
        provider: ProviderConfig::new("https://jtexpress.test/tracking?billcode={billcode}", 5),
        retry: RetryConfig {
            max_attempts: 2,
            retry_delay_secs: 0,
        },
        message: MessageConfig::default(),
        ..TrackerConfig::default()
    }
}

/// Minimal config with the standard key monitored
pub fn monitor_config() -> TrackerConfig {
    minimal_config().with_monitor(MonitorConfig::new(BILLCODE, PHONE, CHAT_ID))
}

/// Short interval for loop tests
pub const FAST_POLL: Duration = Duration::from_millis(50);
