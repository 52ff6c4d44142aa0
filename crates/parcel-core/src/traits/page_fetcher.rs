// # Page Fetcher Trait
//
// Defines the interface for loading the courier's tracking page.
//
// ## Implementations
//
// - Plain HTTP: `parcel-fetch-http` crate
// - Headless browser over WebDriver: `parcel-fetch-webdriver` crate
//
// ## Usage
//
// ```rust,ignore
// use parcel_core::{PageFetcher, TrackingQuery};
//
// let fetcher = /* PageFetcher implementation */;
// let query = TrackingQuery::new("861396533622", "6719")?;
// let content = fetcher.fetch(&query).await?;
// ```

use async_trait::async_trait;

use crate::config::{FetcherConfig, ProviderConfig};
use crate::model::{RawContent, TrackingQuery};

/// Trait for page fetcher implementations
///
/// A fetcher makes exactly one attempt per call. Retry policy belongs to the
/// `Tracker`, which calls `fetch` again with a fresh attempt when the error
/// is retryable.
///
/// # Errors
///
/// Implementations must keep failure kinds distinguishable:
/// - `Error::Timeout`: content never became ready within the per-attempt bound
/// - `Error::TransientNetwork`: connection-level failure
/// - `Error::NotFound`: the page loaded but signals no matching order
///
/// # Resources
///
/// Any browser process or session acquired by an attempt must be released
/// before `fetch` returns, on every path.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Load the tracking page for a validated query
    ///
    /// # Returns
    ///
    /// - `Ok(RawContent)`: page content ready for extraction
    /// - `Err(Error)`: one of the failure kinds above
    async fn fetch(&self, query: &TrackingQuery) -> Result<RawContent, crate::Error>;

    /// Backend name (for logging/debugging)
    fn backend_name(&self) -> &'static str;
}

/// Helper trait for constructing fetchers from configuration
pub trait PageFetcherFactory: Send + Sync {
    /// Create a PageFetcher instance
    ///
    /// # Parameters
    ///
    /// - `config`: backend-specific configuration
    /// - `provider`: courier URL template and per-attempt timeout
    fn create(
        &self,
        config: &FetcherConfig,
        provider: &ProviderConfig,
    ) -> Result<Box<dyn PageFetcher>, crate::Error>;
}
