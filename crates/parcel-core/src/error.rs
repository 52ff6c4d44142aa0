//! Error types for the parcel tracking bot
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for tracking operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the parcel tracking bot
#[derive(Error, Debug)]
pub enum Error {
    /// Bad command arguments (reported immediately, no fetch attempted)
    #[error("Validation error: {0}")]
    Validation(String),

    /// The tracking page never became ready within the per-attempt bound
    #[error("Fetch timed out: {0}")]
    Timeout(String),

    /// Connection-level failure talking to the courier (retryable)
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    /// The page loaded but signals no matching order
    #[error("Tracking not found: {0}")]
    NotFound(String),

    /// The page loaded but holds no status rows
    #[error("No status entries: {0}")]
    ExtractionEmpty(String),

    /// The chat transport rejected a message
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Browser automation errors (session setup, element interaction)
    #[error("Browser error: {0}")]
    Browser(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a transient network error
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientNetwork(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an "extraction empty" error
    pub fn extraction_empty(msg: impl Into<String>) -> Self {
        Self::ExtractionEmpty(msg.into())
    }

    /// Create a delivery error
    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a browser automation error
    pub fn browser(msg: impl Into<String>) -> Self {
        Self::Browser(msg.into())
    }

    /// Whether another attempt with a fresh resource may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::TransientNetwork(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
