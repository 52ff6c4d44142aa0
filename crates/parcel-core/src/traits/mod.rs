//! Core traits for the parcel tracking bot
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`PageFetcher`]: Load the courier's tracking page for a query
//! - [`Notifier`]: Deliver a text message to a chat destination
//! - [`StateStore`]: Persistent last-seen status per tracking key

pub mod notifier;
pub mod page_fetcher;
pub mod state_store;

pub use notifier::Notifier;
pub use page_fetcher::{PageFetcher, PageFetcherFactory};
pub use state_store::StateStore;
