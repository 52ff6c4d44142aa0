// # State Store Trait
//
// Persistence for the last-seen status per tracking key
// (`<billcode>_<phone suffix>` → `"<timestamp>|<description>"`). The
// monitor uses it to decide whether a freshly fetched status is new, across
// restarts.
//
// ## Implementations
//
// - File-based: a flat JSON object, rewritten in full on every change
// - In-memory: for tests and throwaway deployments

use async_trait::async_trait;

/// Trait for state store implementations
///
/// Stores hold at most one value per key; `set_status` replaces whatever
/// was there (last write wins, no history).
///
/// Change detection itself is not a store concern: see
/// [`StatusCache`](crate::cache::StatusCache), which serializes the
/// read-compare-write sequence across callers.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Stored serialized status for `key`, `None` when never seen
    async fn get_status(&self, key: &str) -> Result<Option<String>, crate::Error>;

    /// Replace the status for `key` and persist the whole map
    async fn set_status(&self, key: &str, status: &str) -> Result<(), crate::Error>;

    /// Remove `key` (no-op when absent) and persist the whole map
    async fn delete_status(&self, key: &str) -> Result<(), crate::Error>;

    /// Every tracking key with a stored status
    async fn keys(&self) -> Result<Vec<String>, crate::Error>;

    /// Write out state not yet on disk (e.g. recovered from a backup)
    async fn flush(&self) -> Result<(), crate::Error>;
}
