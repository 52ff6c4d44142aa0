// # parcel-core
//
// Core library for the parcel tracking bot.
//
// ## Architecture Overview
//
// This library owns everything between "a tracking code arrived" and "a
// reply was delivered":
// - **PageFetcher**: Trait for fetching the courier's tracking page
// - **Extractor**: Pure function from parsed page entries to status events
// - **StateStore**: Trait for the persisted last-seen status per tracking key
// - **StatusCache**: Compare-and-persist change detection on top of a StateStore
// - **Notifier**: Trait for delivering messages to a chat destination
// - **Tracker**: Application context that runs queries and the background monitor
// - **FetcherRegistry**: Plugin-based registry for page fetcher backends
//
// ## Design Principles
//
// 1. **Backends are plugins**: scraping technology is swapped via the registry
// 2. **Graceful degradation**: every fetch failure becomes a user-facing reply
// 3. **Engine-owned retry**: fetchers make one attempt, the Tracker retries
// 4. **Idempotent notification**: a status change is pushed exactly once

pub mod cache;
pub mod command;
pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod markup;
pub mod model;
pub mod registry;
pub mod retry;
pub mod state;
pub mod tracker;
pub mod traits;

// Re-export core types for convenience
pub use cache::{CacheOutcome, StatusCache};
pub use command::Command;
pub use config::{
    FetcherConfig, MessageConfig, MonitorConfig, ProviderConfig, RetryConfig, StateStoreConfig,
    TrackerConfig,
};
pub use error::{Error, Result};
pub use model::{FetchOutcome, RawContent, StatusEvent, TrackingQuery, TrackingResult};
pub use registry::FetcherRegistry;
pub use state::{FileStateStore, MemoryStateStore};
pub use tracker::{MonitorEvent, Tracker};
pub use traits::{Notifier, PageFetcher, StateStore};
