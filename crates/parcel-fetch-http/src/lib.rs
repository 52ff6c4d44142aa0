// # HTTP Page Fetcher
//
// This crate provides a plain HTTP page fetcher for the parcel tracking bot.
//
// ## Purpose
//
// A lightweight backend for:
// - Courier pages that render the status list server-side
// - Mirrors or cached copies of the tracking page
// - CI and local testing against a fixture server
//
// ## Not Primary for J&T Express
//
// The public J&T tracking page fills in its status list with JavaScript and
// may ask for the phone digits in a form. Production deployments against it
// use the WebDriver backend (parcel-fetch-webdriver).
//
// ## Architecture
//
// One GET per attempt with a bounded client timeout. The Tracker owns retry.

use parcel_core::config::{FetcherConfig, ProviderConfig};
use parcel_core::markup::MarkupProfile;
use parcel_core::model::{RawContent, TrackingQuery};
use parcel_core::traits::{PageFetcher, PageFetcherFactory};
use parcel_core::{Error, FetcherRegistry, Result};

use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// Browser-like User-Agent; the courier serves a stripped page to unknown clients
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// HTTP-based page fetcher
pub struct HttpFetcher {
    /// Courier endpoint (URL template and time bound)
    provider: ProviderConfig,

    /// Markup adapter used to tell "no such order" from a status page
    profile: MarkupProfile,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a new HTTP fetcher
    ///
    /// The client timeout equals the provider's per-attempt bound.
    pub fn new(provider: ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(provider.fetch_timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            provider,
            profile: MarkupProfile::jt_express()?,
            client,
        })
    }

    /// Client timeout (the per-attempt bound)
    pub fn timeout(&self) -> Duration {
        self.provider.fetch_timeout()
    }
}

/// Map a transport-level reqwest error to the crate error
fn classify_request_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::timeout(format!("Request timed out: {}", e))
    } else {
        Error::transient(format!("Request failed: {}", e))
    }
}

/// Map a non-success HTTP status to the crate error
fn classify_status(status: StatusCode, billcode: &str) -> Error {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Error::transient(format!("HTTP error: {}", status))
    } else {
        Error::not_found(format!("{} (HTTP {})", billcode, status))
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, query: &TrackingQuery) -> Result<RawContent> {
        let url = self.provider.tracking_url(query);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, query.billcode()));
        }

        let html = response.text().await.map_err(classify_request_error)?;

        if !self.profile.has_container(&html) {
            return Err(Error::not_found(format!(
                "{}: no status list on page",
                query.billcode()
            )));
        }

        Ok(RawContent::new(html, url))
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

/// Factory for creating HTTP fetchers
pub struct HttpFetcherFactory;

impl PageFetcherFactory for HttpFetcherFactory {
    fn create(
        &self,
        config: &FetcherConfig,
        provider: &ProviderConfig,
    ) -> Result<Box<dyn PageFetcher>> {
        match config {
            FetcherConfig::Http => Ok(Box::new(HttpFetcher::new(provider.clone())?)),
            _ => Err(Error::config("Invalid config for HTTP fetcher")),
        }
    }
}

/// Register the HTTP fetcher with a registry
pub fn register(registry: &FetcherRegistry) {
    registry.register_fetcher("http", Box::new(HttpFetcherFactory));
}
