//! Daemon configuration from environment variables

use anyhow::{Context, Result};
use parcel_core::config::{
    DEFAULT_URL_TEMPLATE, FetcherConfig, MessageConfig, MonitorConfig, ProviderConfig,
    RetryConfig, StateStoreConfig, TrackerConfig,
};
use parcel_notify_telegram::resolve_webhook_base;
use std::str::FromStr;
use tracing::Level;
use url::Url;

/// How Telegram delivers updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Polling,
    Webhook,
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub telegram_token: String,
    pub mode: String,
    pub webhook_url: Option<String>,
    pub render_hostname: Option<String>,
    pub render_service: Option<String>,
    pub port: u16,
    pub fetcher_type: String,
    pub webdriver_url: String,
    pub provider_url: String,
    pub fetch_timeout_secs: u64,
    pub max_attempts: usize,
    pub retry_delay_secs: u64,
    pub message_limit: usize,
    pub state_store_type: String,
    pub state_path: String,
    pub chat_id: Option<String>,
    pub monitor_billcode: Option<String>,
    pub monitor_phone: Option<String>,
    pub poll_interval_secs: u64,
    pub log_level: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("telegram_token", &"<redacted>")
            .field("mode", &self.mode)
            .field("port", &self.port)
            .field("fetcher_type", &self.fetcher_type)
            .field("state_store_type", &self.state_store_type)
            .field("monitor", &self.monitor_billcode)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup` (variable name to value)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            telegram_token: var("TELEGRAM_TOKEN").unwrap_or_default(),
            mode: var("PARCELBOT_MODE").unwrap_or_else(|| "polling".to_string()),
            webhook_url: var("PARCELBOT_WEBHOOK_URL"),
            render_hostname: var("RENDER_EXTERNAL_HOSTNAME"),
            render_service: var("RENDER_SERVICE_NAME"),
            port: parse_or(var("PORT"), "PORT", 5000)?,
            fetcher_type: var("PARCELBOT_FETCHER").unwrap_or_else(|| "http".to_string()),
            webdriver_url: var("PARCELBOT_WEBDRIVER_URL")
                .unwrap_or_else(|| "http://localhost:9515".to_string()),
            provider_url: var("PARCELBOT_PROVIDER_URL")
                .unwrap_or_else(|| DEFAULT_URL_TEMPLATE.to_string()),
            fetch_timeout_secs: parse_or(
                var("PARCELBOT_FETCH_TIMEOUT_SECS"),
                "PARCELBOT_FETCH_TIMEOUT_SECS",
                45,
            )?,
            max_attempts: parse_or(var("PARCELBOT_MAX_ATTEMPTS"), "PARCELBOT_MAX_ATTEMPTS", 2)?,
            retry_delay_secs: parse_or(
                var("PARCELBOT_RETRY_DELAY_SECS"),
                "PARCELBOT_RETRY_DELAY_SECS",
                2,
            )?,
            message_limit: parse_or(
                var("PARCELBOT_MESSAGE_LIMIT"),
                "PARCELBOT_MESSAGE_LIMIT",
                3800,
            )?,
            state_store_type: var("PARCELBOT_STATE_STORE").unwrap_or_else(|| "file".to_string()),
            state_path: var("PARCELBOT_STATE_PATH")
                .unwrap_or_else(|| "last_status.json".to_string()),
            chat_id: var("PARCELBOT_CHAT_ID"),
            monitor_billcode: var("PARCELBOT_MONITOR_BILLCODE"),
            monitor_phone: var("PARCELBOT_MONITOR_PHONE"),
            poll_interval_secs: parse_or(
                var("PARCELBOT_POLL_INTERVAL_SECS"),
                "PARCELBOT_POLL_INTERVAL_SECS",
                900,
            )?,
            log_level: var("PARCELBOT_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Covers required fields, enumerations, numeric ranges and the
    /// monitor variables, which must be set together or not at all.
    pub fn validate(&self) -> Result<()> {
        if self.telegram_token.is_empty() {
            anyhow::bail!(
                "TELEGRAM_TOKEN is required. \
                Set it via: export TELEGRAM_TOKEN=123456:your_bot_token"
            );
        }

        // Bot API tokens look like "<bot id>:<secret>"
        match self.telegram_token.split_once(':') {
            Some((id, secret)) if id.chars().all(|c| c.is_ascii_digit()) && !secret.is_empty() => {}
            _ => anyhow::bail!(
                "TELEGRAM_TOKEN does not look like a bot token (expected <bot id>:<secret>)"
            ),
        }

        if self.delivery_mode()? == DeliveryMode::Webhook {
            self.webhook_base()?;
        }

        match self.fetcher_type.as_str() {
            "http" | "webdriver" => {}
            _ => anyhow::bail!(
                "PARCELBOT_FETCHER '{}' is not supported. \
                Supported fetchers: http, webdriver",
                self.fetcher_type
            ),
        }

        match self.state_store_type.as_str() {
            "file" | "memory" => {}
            _ => anyhow::bail!(
                "PARCELBOT_STATE_STORE '{}' is not supported. \
                Supported types: file, memory",
                self.state_store_type
            ),
        }

        if self.state_store_type == "file"
            && let Some(parent) = std::path::Path::new(&self.state_path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            anyhow::bail!(
                "PARCELBOT_STATE_PATH parent directory does not exist: {}. \
                Create it first: mkdir -p {}",
                parent.display(),
                parent.display()
            );
        }

        check_range("PARCELBOT_FETCH_TIMEOUT_SECS", self.fetch_timeout_secs, 1, 300)?;
        check_range("PARCELBOT_MAX_ATTEMPTS", self.max_attempts, 1, 5)?;
        check_range("PARCELBOT_RETRY_DELAY_SECS", self.retry_delay_secs, 0, 60)?;
        check_range("PARCELBOT_MESSAGE_LIMIT", self.message_limit, 200, 4096)?;
        check_range("PARCELBOT_POLL_INTERVAL_SECS", self.poll_interval_secs, 60, 86400)?;

        match (&self.chat_id, &self.monitor_billcode, &self.monitor_phone) {
            (None, None, None) | (Some(_), Some(_), Some(_)) => {}
            _ => anyhow::bail!(
                "PARCELBOT_CHAT_ID, PARCELBOT_MONITOR_BILLCODE and PARCELBOT_MONITOR_PHONE \
                must be set together to enable the monitor"
            ),
        }

        self.log_level()?;

        // Cross-check with the core configuration rules
        self.tracker_config()
            .validate()
            .context("Invalid tracker configuration")?;

        Ok(())
    }

    /// Parsed delivery mode
    pub fn delivery_mode(&self) -> Result<DeliveryMode> {
        match self.mode.to_lowercase().as_str() {
            "polling" => Ok(DeliveryMode::Polling),
            "webhook" => Ok(DeliveryMode::Webhook),
            _ => anyhow::bail!(
                "PARCELBOT_MODE '{}' is not valid. Valid modes: polling, webhook",
                self.mode
            ),
        }
    }

    /// Public base URL for webhook delivery
    pub fn webhook_base(&self) -> Result<Url> {
        resolve_webhook_base(
            self.webhook_url.as_deref(),
            self.render_hostname.as_deref(),
            self.render_service.as_deref(),
        )
        .context("PARCELBOT_WEBHOOK_URL is not usable")
    }

    /// Parsed log level
    pub fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "PARCELBOT_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    /// Core tracker configuration
    pub fn tracker_config(&self) -> TrackerConfig {
        let fetcher = match self.fetcher_type.as_str() {
            "webdriver" => FetcherConfig::WebDriver {
                webdriver_url: self.webdriver_url.clone(),
                headless: true,
            },
            _ => FetcherConfig::Http,
        };

        let state_store = match self.state_store_type.as_str() {
            "memory" => StateStoreConfig::Memory,
            _ => StateStoreConfig::File {
                path: self.state_path.clone(),
            },
        };

        let monitor = match (&self.chat_id, &self.monitor_billcode, &self.monitor_phone) {
            (Some(chat_id), Some(billcode), Some(phone)) => Some(
                MonitorConfig::new(billcode, phone, chat_id)
                    .with_interval_secs(self.poll_interval_secs),
            ),
            _ => None,
        };

        TrackerConfig {
            provider: ProviderConfig::new(&self.provider_url, self.fetch_timeout_secs),
            fetcher,
            state_store,
            retry: RetryConfig {
                max_attempts: self.max_attempts,
                retry_delay_secs: self.retry_delay_secs,
            },
            message: MessageConfig {
                max_chars: self.message_limit,
                max_status_lines: None,
            },
            monitor,
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, name: &str, default: T) -> Result<T> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a number. Got: {}", name, raw)),
        None => Ok(default),
    }
}

fn check_range<T>(name: &str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        anyhow::bail!(
            "{} must be between {} and {}. Got: {}",
            name,
            min,
            max,
            value
        );
    }
    Ok(())
}
