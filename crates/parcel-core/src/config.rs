//! Configuration types for the parcel tracking bot
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::TrackingQuery;

/// Default courier tracking URL (J&T Express Vietnam)
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://jtexpress.vn/vi/tracking?type=track&billcode={billcode}&cellphone={phone}";

/// Main tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Courier endpoint configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Scraping backend
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Status cache persistence
    #[serde(default)]
    pub state_store: StateStoreConfig,

    /// Fetch retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Reply formatting limits
    #[serde(default)]
    pub message: MessageConfig,

    /// Unattended monitoring of a single tracking key (disabled when absent)
    #[serde(default)]
    pub monitor: Option<MonitorConfig>,
}

impl TrackerConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            provider: ProviderConfig::default(),
            fetcher: FetcherConfig::default(),
            state_store: StateStoreConfig::default(),
            retry: RetryConfig::default(),
            message: MessageConfig::default(),
            monitor: None,
        }
    }

    /// Enable the background monitor
    pub fn with_monitor(mut self, monitor: MonitorConfig) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.provider.validate()?;
        self.fetcher.validate()?;
        self.retry.validate()?;
        self.message.validate()?;
        if let Some(monitor) = &self.monitor {
            monitor.validate()?;
        }
        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Courier endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Tracking URL with `{billcode}` and `{phone}` placeholders
    #[serde(default = "default_url_template")]
    pub url_template: String,

    /// Hard wall-clock bound for a single fetch attempt (in seconds)
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl ProviderConfig {
    pub fn new(url_template: impl Into<String>, fetch_timeout_secs: u64) -> Self {
        Self {
            url_template: url_template.into(),
            fetch_timeout_secs,
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !self.url_template.starts_with("http://") && !self.url_template.starts_with("https://")
        {
            return Err(crate::Error::config(format!(
                "Provider URL must use HTTP or HTTPS scheme. Got: {}",
                self.url_template
            )));
        }
        if !self.url_template.contains("{billcode}") {
            return Err(crate::Error::config(
                "Provider URL template must contain {billcode}",
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(crate::Error::config("Fetch timeout must be > 0"));
        }
        Ok(())
    }

    /// Fill the template for a query
    pub fn tracking_url(&self, query: &TrackingQuery) -> String {
        self.url_template
            .replace("{billcode}", query.billcode())
            .replace("{phone}", query.phone_suffix())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url_template: default_url_template(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

/// Page fetcher backend configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetcherConfig {
    /// Plain HTTP GET of the tracking page
    #[default]
    Http,

    /// Headless browser driven over the WebDriver protocol
    WebDriver {
        /// WebDriver server URL (e.g., chromedriver on port 9515)
        webdriver_url: String,
        /// Run the browser without a window
        #[serde(default = "default_headless")]
        headless: bool,
    },
}

impl FetcherConfig {
    /// Validate the fetcher configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            FetcherConfig::Http => Ok(()),
            FetcherConfig::WebDriver { webdriver_url, .. } => {
                if webdriver_url.is_empty() {
                    return Err(crate::Error::config("WebDriver URL cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Registry name of the backend
    pub fn type_name(&self) -> &str {
        match self {
            FetcherConfig::Http => "http",
            FetcherConfig::WebDriver { .. } => "webdriver",
        }
    }
}

/// State store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// File-based state store
    File {
        /// Path to the state file
        path: String,
    },

    /// In-memory state store (not persistent)
    #[default]
    Memory,
}

/// Fetch retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total fetch attempts per lookup, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Delay between attempts (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_attempts == 0 {
            return Err(crate::Error::config("max_attempts must be at least 1"));
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

/// Reply formatting limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    /// Maximum characters in one outgoing message
    ///
    /// Telegram rejects messages above 4096 characters; the default leaves
    /// headroom for the overflow pointer.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Maximum status lines in a reply (all lines when absent)
    #[serde(default)]
    pub max_status_lines: Option<usize>,
}

impl MessageConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_chars < MIN_MESSAGE_CHARS {
            return Err(crate::Error::config(format!(
                "max_chars must be at least {}",
                MIN_MESSAGE_CHARS
            )));
        }
        if self.max_status_lines == Some(0) {
            return Err(crate::Error::config("max_status_lines must be > 0"));
        }
        Ok(())
    }
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            max_status_lines: None,
        }
    }
}

/// Unattended monitoring of one tracking key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub billcode: String,
    pub phone_suffix: String,

    /// Chat that receives change notifications
    pub chat_id: String,

    /// Poll interval (in seconds)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl MonitorConfig {
    pub fn new(
        billcode: impl Into<String>,
        phone_suffix: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            billcode: billcode.into(),
            phone_suffix: phone_suffix.into(),
            chat_id: chat_id.into(),
            interval_secs: default_interval_secs(),
        }
    }

    pub fn with_interval_secs(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs;
        self
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        self.query()
            .map_err(|e| crate::Error::config(format!("Monitored tracking key: {}", e)))?;
        if self.chat_id.trim().is_empty() {
            return Err(crate::Error::config("Monitor chat_id cannot be empty"));
        }
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Monitor interval must be > 0"));
        }
        Ok(())
    }

    /// The monitored tracking key as a validated query
    pub fn query(&self) -> Result<TrackingQuery, crate::Error> {
        TrackingQuery::new(&self.billcode, &self.phone_suffix)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Smallest message budget that still fits the overflow pointer
const MIN_MESSAGE_CHARS: usize = 200;

fn default_url_template() -> String {
    DEFAULT_URL_TEMPLATE.to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    45
}

fn default_headless() -> bool {
    true
}

fn default_max_attempts() -> usize {
    2
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_max_chars() -> usize {
    3800
}

fn default_interval_secs() -> u64 {
    900
}
