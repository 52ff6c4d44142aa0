//! Tracker: the application context
//!
//! The Tracker is constructed once at startup and shared by every handler.
//! It is responsible for:
//! - Running interactive lookups (`/check`) and turning every outcome into a reply
//! - Polling the monitored tracking key on a fixed interval
//! - Checking the status cache so each change is announced exactly once
//! - Delivering notifications, logging and swallowing delivery failures
//!
//! ## Architecture
//!
//! ```text
//!  chat command ──┐                 ┌── interval tick
//!                 ▼                 ▼
//!            ┌──────────────────────────┐
//!            │         Tracker          │
//!            └──────────────────────────┘
//!                 │        │        │
//!       ┌─────────┘        │        └──────────┐
//!       ▼                  ▼                   ▼
//! ┌─────────────┐   ┌──────────────┐    ┌─────────────┐
//! │ PageFetcher │   │ StatusCache  │    │  Notifier   │
//! │ (+ retry)   │   │ (check/set)  │    │  (deliver)  │
//! └─────────────┘   └──────────────┘    └─────────────┘
//! ```
//!
//! ## Query Flow
//!
//! Fetch → Extract → Cache-check → Respond, strictly in that order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheOutcome, StatusCache};
use crate::command::Command;
use crate::config::{MessageConfig, MonitorConfig, ProviderConfig, TrackerConfig};
use crate::error::{Error, Result};
use crate::extract::extract;
use crate::format;
use crate::markup::MarkupProfile;
use crate::model::{FetchOutcome, RawContent, TrackingQuery, TrackingResult};
use crate::retry::{RetryPolicy, with_retry};
use crate::traits::{Notifier, PageFetcher, StateStore};

/// Capacity of the monitor event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events emitted by the background monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Monitor loop started
    Started { key: String, interval: Duration },

    /// A poll fetched and extracted at least one status event
    PollSucceeded { key: String, events: usize },

    /// The newest status differs from the cached one
    ChangeDetected {
        key: String,
        status: String,
        previous: Option<String>,
    },

    /// The newest status equals the cached one
    Unchanged { key: String },

    /// A poll ended without a usable status
    PollFailed { key: String, error: String },

    /// The change notification could not be delivered
    NotificationFailed { key: String, error: String },

    /// Monitor loop stopped
    Stopped { reason: String },
}

/// Application context for lookups and monitoring
///
/// ## Lifecycle
///
/// 1. Create with [`Tracker::new()`]
/// 2. Share behind an `Arc` with the chat dispatcher
/// 3. Start the monitor with [`Tracker::run()`] on its own task
/// 4. The monitor stops on shutdown signal and flushes the cache
pub struct Tracker {
    /// Scraping backend
    fetcher: Box<dyn PageFetcher>,

    /// Last-seen status per tracking key
    cache: StatusCache,

    /// Outbound chat delivery
    notifier: Arc<dyn Notifier>,

    /// Provider markup adapter
    profile: MarkupProfile,

    provider: ProviderConfig,
    retry: RetryPolicy,
    message: MessageConfig,

    /// Monitored key (monitor disabled when absent)
    monitor: Option<MonitorConfig>,

    /// Time between monitor polls
    poll_interval: Duration,

    /// Event sender for external observation
    event_tx: mpsc::Sender<MonitorEvent>,
}

impl Tracker {
    /// Create a new tracker
    ///
    /// # Returns
    ///
    /// A tuple of (tracker, event_receiver) where event_receiver yields
    /// monitor events. Dropping the receiver is fine; events are then
    /// discarded.
    pub fn new(
        fetcher: Box<dyn PageFetcher>,
        state_store: Box<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
        config: TrackerConfig,
    ) -> Result<(Self, mpsc::Receiver<MonitorEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let poll_interval = config
            .monitor
            .as_ref()
            .map(MonitorConfig::interval)
            .unwrap_or(Duration::from_secs(900));

        let tracker = Self {
            fetcher,
            cache: StatusCache::new(state_store),
            notifier,
            profile: MarkupProfile::jt_express()?,
            retry: RetryPolicy::from(&config.retry),
            provider: config.provider,
            message: config.message,
            monitor: config.monitor,
            poll_interval,
            event_tx: tx,
        };

        Ok((tracker, rx))
    }

    /// Override the monitor poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Handle an inbound chat message
    ///
    /// # Returns
    ///
    /// - `Some(reply)`: text to send back to the requesting chat
    /// - `None`: the message is not a command for this bot
    pub async fn handle_command(&self, text: &str) -> Option<String> {
        let command = match Command::parse(text) {
            Ok(Some(command)) => command,
            Ok(None) => return None,
            Err(Error::Validation(detail)) => {
                debug!("Rejected command {:?}: {}", text, detail);
                return Some(format::format_validation_error(&detail));
            }
            Err(e) => {
                error!("Failed to parse command: {}", e);
                return None;
            }
        };

        let reply = match command {
            Command::Start => format::START_TEXT.to_string(),
            Command::Help => format::HELP_TEXT.to_string(),
            Command::Check(query) => {
                info!("Lookup requested: {}", query);
                let result = self.lookup(&query).await;
                if result.is_success() {
                    if let Err(e) = self.record(&result).await {
                        warn!("Failed to record status for {}: {}", query.cache_key(), e);
                    }
                }
                format::format_reply(&result, &self.message)
            }
        };

        Some(reply)
    }

    /// Fetch and extract the status history for `query`
    ///
    /// Never fails: every error is folded into [`TrackingResult::outcome`].
    pub async fn lookup(&self, query: &TrackingQuery) -> TrackingResult {
        let source_url = self.provider.tracking_url(query);

        let fetched = with_retry(
            self.retry,
            |attempt| {
                debug!(
                    "Fetching {} via {} (attempt {}/{})",
                    query,
                    self.fetcher.backend_name(),
                    attempt,
                    self.retry.max_attempts
                );
                self.fetch_once(query)
            },
            Error::is_retryable,
        )
        .await;

        let (events, outcome) = match fetched {
            Ok(content) => {
                let events = extract(&content, &self.profile);
                if events.is_empty() {
                    (events, FetchOutcome::Empty)
                } else {
                    (events, FetchOutcome::Success)
                }
            }
            Err(e) => {
                warn!("Lookup failed for {}: {}", query, e);
                let outcome = match e {
                    Error::NotFound(_) => FetchOutcome::NotFound,
                    Error::Timeout(_) => FetchOutcome::Timeout,
                    Error::ExtractionEmpty(_) => FetchOutcome::Empty,
                    other => FetchOutcome::TransientError(other.to_string()),
                };
                (Vec::new(), outcome)
            }
        };

        TrackingResult {
            query: query.clone(),
            source_url,
            events,
            outcome,
        }
    }

    /// One fetch attempt under the hard wall-clock bound
    async fn fetch_once(&self, query: &TrackingQuery) -> Result<RawContent> {
        let bound = self.provider.fetch_timeout();
        match tokio::time::timeout(bound, self.fetcher.fetch(query)).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(format!(
                "{} did not finish within {:?}",
                self.fetcher.backend_name(),
                bound
            ))),
        }
    }

    /// Compare-and-persist the newest event of a result
    pub async fn record(&self, result: &TrackingResult) -> Result<CacheOutcome> {
        self.cache
            .check_and_update(&result.query.cache_key(), result.latest())
            .await
    }

    /// Deliver `text`, logging and swallowing failures
    ///
    /// # Returns
    ///
    /// Whether the transport accepted the message.
    pub async fn respond(&self, destination: &str, text: &str) -> bool {
        match self.notifier.send_message(destination, text).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "Failed to deliver message to {} via {}: {}",
                    destination,
                    self.notifier.notifier_name(),
                    e
                );
                false
            }
        }
    }

    /// Poll the monitored key once
    ///
    /// Notifies the monitor chat when the cache reports a change.
    ///
    /// # Returns
    ///
    /// - `Ok(CacheOutcome)`: the poll produced a status and the cache was checked
    /// - `Err(Error)`: monitor disabled, lookup without a usable status, or
    ///   cache failure
    pub async fn poll_once(&self) -> Result<CacheOutcome> {
        let monitor = self
            .monitor
            .as_ref()
            .ok_or_else(|| Error::config("Monitor is not configured"))?;
        let query = monitor.query()?;
        let key = query.cache_key();

        let result = self.lookup(&query).await;
        let failure = match &result.outcome {
            FetchOutcome::Success => None,
            FetchOutcome::Empty => Some(Error::extraction_empty(query.billcode())),
            FetchOutcome::NotFound => Some(Error::not_found(query.billcode())),
            FetchOutcome::Timeout => Some(Error::timeout(query.billcode())),
            FetchOutcome::TransientError(detail) => Some(Error::transient(detail.clone())),
        };
        if let Some(error) = failure {
            self.emit_event(MonitorEvent::PollFailed {
                key,
                error: error.to_string(),
            });
            return Err(error);
        }

        self.emit_event(MonitorEvent::PollSucceeded {
            key: key.clone(),
            events: result.events.len(),
        });

        let outcome = self.record(&result).await?;
        match &outcome {
            CacheOutcome::Unchanged => {
                debug!("No change for {}", key);
                self.emit_event(MonitorEvent::Unchanged { key });
            }
            CacheOutcome::Changed { previous } => {
                let status = result
                    .latest()
                    .map(|e| e.cache_value())
                    .unwrap_or_default();
                info!("New status for {}: {}", key, status);
                self.emit_event(MonitorEvent::ChangeDetected {
                    key: key.clone(),
                    status,
                    previous: previous.clone(),
                });

                let text = format::format_change_notification(&result, &self.message);
                if !self.respond(&monitor.chat_id, &text).await {
                    self.emit_event(MonitorEvent::NotificationFailed {
                        key,
                        error: format!("delivery to {} failed", monitor.chat_id),
                    });
                }
            }
        }

        Ok(outcome)
    }

    /// Run the monitor until SIGINT
    ///
    /// Returns immediately when no monitor is configured.
    pub async fn run(&self) -> Result<()> {
        self.run_with_shutdown(None).await
    }

    /// Run the monitor until `shutdown_rx` fires (or SIGINT when `None`)
    ///
    /// A failed poll is logged and the loop resumes on the next tick. The
    /// first poll runs immediately. A shutdown arriving mid-poll cancels the
    /// poll. On exit the status cache is flushed.
    pub async fn run_with_shutdown(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        let Some(monitor) = &self.monitor else {
            info!("Monitor not configured, background polling disabled");
            return Ok(());
        };
        let key = monitor.query()?.cache_key();

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for shutdown signal: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(interval);

        info!(
            "Monitoring {} every {:?}, notifying chat {}",
            key, self.poll_interval, monitor.chat_id
        );
        self.emit_event(MonitorEvent::Started {
            key: key.clone(),
            interval: self.poll_interval,
        });

        loop {
            tokio::select! {
                Some(_) = ticks.next() => {
                    // An in-flight poll is abandoned on shutdown
                    let interrupted = tokio::select! {
                        polled = self.poll_once() => {
                            if let Err(e) = polled {
                                // Continue running despite errors
                                warn!("Poll of {} failed: {}", key, e);
                            }
                            false
                        }
                        _ = &mut shutdown => true,
                    };
                    if interrupted {
                        info!("Shutdown signal received during poll of {}", key);
                        break;
                    }
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.emit_event(MonitorEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });

        self.cache.flush().await?;
        info!("State flushed, monitor stopped");

        Ok(())
    }

    /// Emit a monitor event, dropping it when the channel is full
    fn emit_event(&self, event: MonitorEvent) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Monitor event channel full, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_event_clone() {
        let event = MonitorEvent::ChangeDetected {
            key: "861396533622_6719".to_string(),
            status: "01/01/2024 10:00|Delivered".to_string(),
            previous: None,
        };
        assert_eq!(event.clone(), event);
    }
}
