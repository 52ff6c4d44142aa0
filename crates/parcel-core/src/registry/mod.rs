//! Plugin-based fetcher registry
//!
//! Scraping backends register a factory under a type name; the daemon then
//! instantiates whichever backend the configuration names, without a
//! hard-coded if-else chain.
//!
//! ## Registration
//!
//! ```rust,ignore
//! // In the parcel-fetch-http crate
//! pub fn register(registry: &FetcherRegistry) {
//!     registry.register_fetcher("http", Box::new(HttpFetcherFactory));
//! }
//! ```

use crate::config::{FetcherConfig, ProviderConfig};
use crate::error::{Error, Result};
use crate::traits::{PageFetcher, PageFetcherFactory};
use std::collections::HashMap;
use std::sync::RwLock;

/// Registry of page fetcher factories
///
/// Interior mutability with RwLock allows registration through a shared
/// reference.
#[derive(Default)]
pub struct FetcherRegistry {
    fetchers: RwLock<HashMap<String, Box<dyn PageFetcherFactory>>>,
}

impl FetcherRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fetcher factory under `name` (e.g., "http", "webdriver")
    ///
    /// A later registration under the same name replaces the earlier one.
    pub fn register_fetcher(&self, name: impl Into<String>, factory: Box<dyn PageFetcherFactory>) {
        let name = name.into();
        match self.fetchers.write() {
            Ok(mut fetchers) => {
                fetchers.insert(name, factory);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(name, factory);
            }
        }
    }

    /// Create the fetcher named by `config`
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn PageFetcher>)`: Created fetcher instance
    /// - `Err(Error::Config)`: If the backend is not registered or creation fails
    pub fn create_fetcher(
        &self,
        config: &FetcherConfig,
        provider: &ProviderConfig,
    ) -> Result<Box<dyn PageFetcher>> {
        let fetcher_type = config.type_name();
        let fetchers = self
            .fetchers
            .read()
            .map_err(|_| Error::config("Fetcher registry lock poisoned"))?;

        let factory = fetchers
            .get(fetcher_type)
            .ok_or_else(|| Error::config(format!("Unknown fetcher type: {}", fetcher_type)))?;

        factory.create(config, provider)
    }

    /// List all registered fetcher types
    pub fn list_fetchers(&self) -> Vec<String> {
        self.fetchers
            .read()
            .map(|fetchers| fetchers.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Check if a fetcher type is registered
    pub fn has_fetcher(&self, name: &str) -> bool {
        self.fetchers
            .read()
            .map(|fetchers| fetchers.contains_key(name))
            .unwrap_or(false)
    }
}
