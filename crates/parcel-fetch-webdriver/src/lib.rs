// # WebDriver Page Fetcher
//
// This crate provides a headless-browser page fetcher for the parcel
// tracking bot.
//
// ## Purpose
//
// The J&T Express tracking page renders its status list with JavaScript and
// may ask for the last phone digits in a verification form before showing
// it. A plain GET never sees the list; this backend drives a real Chrome
// through a WebDriver server (chromedriver, default port 9515).
//
// ## Per-Attempt Sessions
//
// Every fetch opens a fresh browser session and quits it before returning,
// on success, failure and timeout alike. Sessions are never shared between
// concurrent lookups or reused across retries.

use parcel_core::config::{FetcherConfig, ProviderConfig};
use parcel_core::markup::{JT_ENTRY_SELECTOR, MarkupProfile};
use parcel_core::model::{RawContent, TrackingQuery};
use parcel_core::traits::{PageFetcher, PageFetcherFactory};
use parcel_core::{Error, FetcherRegistry, Result};

use std::time::{Duration, Instant};
use thirtyfour::prelude::*;
use thirtyfour::{ChromeCapabilities, error::WebDriverError};
use tracing::{debug, warn};

/// Phone-suffix input of the verification form
pub const PHONE_INPUT_SELECTOR: &str = r#"input[placeholder*="4 số cuối"]"#;

/// Submit button of the verification form
pub const PHONE_SUBMIT_SELECTOR: &str =
    r#"button.btn-confirm, button[type="submit"], button[onclick*="verify"]"#;

/// Chrome flags for containerised hosts
const BROWSER_ARGS: &[&str] = &["--no-sandbox", "--disable-dev-shm-usage"];

/// How long to look for the verification form before assuming there is none
const FORM_WAIT: Duration = Duration::from_secs(15);

/// Element polling interval
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Time reserved at the end of an attempt for closing the session
const QUIT_MARGIN: Duration = Duration::from_secs(3);

/// Time kept after the entry wait for reading the page source
const SOURCE_MARGIN: Duration = Duration::from_secs(2);

/// Headless-browser page fetcher
pub struct WebDriverFetcher {
    /// WebDriver server URL (e.g., "http://localhost:9515")
    webdriver_url: String,

    /// Run Chrome without a window
    headless: bool,

    /// Courier endpoint (URL template and time bound)
    provider: ProviderConfig,

    /// Markup adapter used to tell "no such order" from a status page
    profile: MarkupProfile,
}

impl WebDriverFetcher {
    /// Create a new WebDriver fetcher
    pub fn new(
        webdriver_url: impl Into<String>,
        headless: bool,
        provider: ProviderConfig,
    ) -> Result<Self> {
        Ok(Self {
            webdriver_url: webdriver_url.into(),
            headless,
            provider,
            profile: MarkupProfile::jt_express()?,
        })
    }

    /// Browser capabilities for a new session
    fn capabilities(&self) -> Result<ChromeCapabilities> {
        let mut caps = DesiredCapabilities::chrome();
        if self.headless {
            caps.set_headless().map_err(browser_error)?;
        }
        for arg in BROWSER_ARGS {
            caps.add_arg(arg).map_err(browser_error)?;
        }
        Ok(caps)
    }

    /// Bound for everything between session start and quit
    fn load_budget(&self, started: Instant) -> Duration {
        self.provider
            .fetch_timeout()
            .saturating_sub(QUIT_MARGIN)
            .saturating_sub(started.elapsed())
    }

    /// Load the tracking page in `driver` and return its rendered source
    ///
    /// Both element waits are carved out of the time left before
    /// `deadline`, so a page without status entries is reported as not
    /// found rather than timing out.
    async fn load(
        &self,
        driver: &WebDriver,
        query: &TrackingQuery,
        url: &str,
        deadline: Instant,
    ) -> Result<String> {
        driver.goto(url).await.map_err(transient_error)?;

        self.submit_phone_form(driver, query, form_wait(remaining(deadline)))
            .await?;

        let entry = driver
            .query(By::Css(JT_ENTRY_SELECTOR))
            .wait(entry_wait(remaining(deadline)), POLL_INTERVAL)
            .first_opt()
            .await
            .map_err(browser_error)?;
        if entry.is_none() {
            debug!("No status entries rendered for {}", query.billcode());
        }

        let html = driver.source().await.map_err(transient_error)?;
        if !self.profile.has_container(&html) {
            return Err(Error::not_found(format!(
                "{}: no status list on page",
                query.billcode()
            )));
        }

        Ok(html)
    }

    /// Fill the phone-suffix form if the page shows one; submitted at most once
    async fn submit_phone_form(
        &self,
        driver: &WebDriver,
        query: &TrackingQuery,
        wait: Duration,
    ) -> Result<()> {
        let input = driver
            .query(By::Css(PHONE_INPUT_SELECTOR))
            .wait(wait, POLL_INTERVAL)
            .first_opt()
            .await
            .map_err(browser_error)?;

        let Some(input) = input else {
            debug!("No verification form for {}", query.billcode());
            return Ok(());
        };

        input
            .send_keys(query.phone_suffix())
            .await
            .map_err(browser_error)?;

        let submit = driver
            .query(By::Css(PHONE_SUBMIT_SELECTOR))
            .nowait()
            .first_opt()
            .await
            .map_err(browser_error)?;

        match submit {
            Some(button) => button.click().await.map_err(browser_error)?,
            None => warn!("Verification form has no submit button"),
        }

        Ok(())
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

/// Form wait, at most a third of what is left
fn form_wait(remaining: Duration) -> Duration {
    FORM_WAIT.min(remaining / 3)
}

/// Entry wait, ending `SOURCE_MARGIN` before the deadline
fn entry_wait(remaining: Duration) -> Duration {
    remaining.saturating_sub(SOURCE_MARGIN)
}

/// Errors from element interaction
fn browser_error(e: WebDriverError) -> Error {
    Error::browser(e.to_string())
}

/// Errors from session setup and navigation (a fresh attempt may succeed)
fn transient_error(e: WebDriverError) -> Error {
    Error::transient(format!("WebDriver: {}", e))
}

#[async_trait::async_trait]
impl PageFetcher for WebDriverFetcher {
    async fn fetch(&self, query: &TrackingQuery) -> Result<RawContent> {
        let started = Instant::now();
        let url = self.provider.tracking_url(query);

        let caps = self.capabilities()?;
        let session = WebDriver::new(self.webdriver_url.as_str(), caps);
        let driver = match tokio::time::timeout(self.load_budget(started), session).await {
            Ok(driver) => driver.map_err(transient_error)?,
            Err(_) => return Err(Error::timeout("Browser session did not start in time")),
        };
        debug!("Browser session opened for {}", url);

        let budget = self.load_budget(started);
        let deadline = Instant::now() + budget;
        let loaded = tokio::time::timeout(budget, self.load(&driver, query, &url, deadline)).await;

        if let Err(e) = driver.quit().await {
            warn!("Failed to close browser session: {}", e);
        }

        match loaded {
            Ok(html) => Ok(RawContent::new(html?, url)),
            Err(_) => Err(Error::timeout(format!(
                "Page not ready within {:?}",
                budget
            ))),
        }
    }

    fn backend_name(&self) -> &'static str {
        "webdriver"
    }
}

/// Factory for creating WebDriver fetchers
pub struct WebDriverFetcherFactory;

impl PageFetcherFactory for WebDriverFetcherFactory {
    fn create(
        &self,
        config: &FetcherConfig,
        provider: &ProviderConfig,
    ) -> Result<Box<dyn PageFetcher>> {
        match config {
            FetcherConfig::WebDriver {
                webdriver_url,
                headless,
            } => Ok(Box::new(WebDriverFetcher::new(
                webdriver_url.clone(),
                *headless,
                provider.clone(),
            )?)),
            _ => Err(Error::config("Invalid config for WebDriver fetcher")),
        }
    }
}

/// Register the WebDriver fetcher with a registry
pub fn register(registry: &FetcherRegistry) {
    registry.register_fetcher("webdriver", Box::new(WebDriverFetcherFactory));
}
