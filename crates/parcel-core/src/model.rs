//! Data model shared by fetchers, the extractor and the tracker

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Number of phone digits the courier uses as a verification factor
pub const PHONE_SUFFIX_LEN: usize = 4;

/// A validated (billcode, phone suffix) pair
///
/// Constructed only through [`TrackingQuery::new`], so every instance
/// carries a non-empty numeric billcode and exactly four phone digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackingQuery {
    billcode: String,
    phone_suffix: String,
}

impl TrackingQuery {
    /// Validate and build a query
    ///
    /// Surrounding whitespace is trimmed from both arguments.
    pub fn new(billcode: impl AsRef<str>, phone_suffix: impl AsRef<str>) -> Result<Self> {
        let billcode = billcode.as_ref().trim();
        let phone_suffix = phone_suffix.as_ref().trim();

        if billcode.is_empty() {
            return Err(Error::validation("tracking code cannot be empty"));
        }
        if !billcode.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::validation(format!(
                "tracking code must be numeric, got '{}'",
                billcode
            )));
        }
        if phone_suffix.chars().count() != PHONE_SUFFIX_LEN
            || !phone_suffix.chars().all(|c| c.is_ascii_digit())
        {
            return Err(Error::validation(format!(
                "phone suffix must be exactly {} digits",
                PHONE_SUFFIX_LEN
            )));
        }

        Ok(Self {
            billcode: billcode.to_string(),
            phone_suffix: phone_suffix.to_string(),
        })
    }

    pub fn billcode(&self) -> &str {
        &self.billcode
    }

    pub fn phone_suffix(&self) -> &str {
        &self.phone_suffix
    }

    /// Status cache key: `<billcode>_<phone suffix>`
    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.billcode, self.phone_suffix)
    }
}

impl fmt::Display for TrackingQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (phone *{})", self.billcode, self.phone_suffix)
    }
}

/// One timestamped milestone in a shipment's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Provider-formatted `"<date> <time>"`, empty when the page omits it
    pub timestamp: String,
    /// Free-text status description, empty when the page omits it
    pub description: String,
}

impl StatusEvent {
    pub fn new(timestamp: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            description: description.into(),
        }
    }

    /// Serialized form stored in the status cache
    pub fn cache_value(&self) -> String {
        format!("{}|{}", self.timestamp, self.description)
    }
}

/// Page content handed from a fetcher to the extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawContent {
    /// Rendered or raw HTML of the tracking page
    pub html: String,
    /// URL the content was loaded from
    pub source_url: String,
}

impl RawContent {
    pub fn new(html: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            source_url: source_url.into(),
        }
    }
}

/// How a tracking lookup ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Page loaded and at least one status event was extracted
    Success,
    /// Page loaded but the status list was empty
    Empty,
    /// Page signals no matching order
    NotFound,
    /// Every attempt ran past its time bound
    Timeout,
    /// Network failure, or any other non-terminal failure, with a short detail
    TransientError(String),
}

/// Result of one end-to-end lookup, newest event first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingResult {
    pub query: TrackingQuery,
    pub source_url: String,
    pub events: Vec<StatusEvent>,
    pub outcome: FetchOutcome,
}

impl TrackingResult {
    /// Most recent status event, if any
    pub fn latest(&self) -> Option<&StatusEvent> {
        self.events.first()
    }

    pub fn is_success(&self) -> bool {
        self.outcome == FetchOutcome::Success
    }
}
