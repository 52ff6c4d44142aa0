//! Change-detection cache
//!
//! Wraps a [`StateStore`] with the one compare-and-persist primitive used by
//! both the interactive path and the background monitor. The read, compare
//! and write run inside a single critical section, so two callers racing on
//! the same key cannot lose an update: the stored value always reflects the
//! most recently confirmed event.

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::model::StatusEvent;
use crate::traits::StateStore;

/// Result of [`StatusCache::check_and_update`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Stored value differed (or was absent) and has been replaced
    Changed {
        /// The value stored before this call
        previous: Option<String>,
    },
    /// Stored value equals the latest event; nothing was written
    Unchanged,
}

impl CacheOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, CacheOutcome::Changed { .. })
    }
}

/// Process-wide last-seen status per tracking key
pub struct StatusCache {
    store: Box<dyn StateStore>,
    write_lock: Mutex<()>,
}

impl StatusCache {
    pub fn new(store: Box<dyn StateStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Compare `latest` against the stored value for `key` and persist on change
    ///
    /// - Equal values, including both absent: `Unchanged`, no write.
    /// - Different values, including the first observation: the new value is
    ///   stored (or the key removed when `latest` is `None`) and `Changed` is
    ///   returned, so the caller notifies exactly once per change.
    pub async fn check_and_update(
        &self,
        key: &str,
        latest: Option<&StatusEvent>,
    ) -> Result<CacheOutcome> {
        let _guard = self.write_lock.lock().await;

        let previous = self.store.get_status(key).await?;
        let current = latest.map(StatusEvent::cache_value);

        if previous == current {
            debug!("Status for {} unchanged", key);
            return Ok(CacheOutcome::Unchanged);
        }

        match &current {
            Some(value) => self.store.set_status(key, value).await?,
            None => self.store.delete_status(key).await?,
        }

        debug!("Status for {} changed: {:?} -> {:?}", key, previous, current);
        Ok(CacheOutcome::Changed { previous })
    }

    /// Stored serialized status for `key`
    pub async fn last_status(&self, key: &str) -> Result<Option<String>> {
        self.store.get_status(key).await
    }

    /// Persist pending changes (called on shutdown)
    pub async fn flush(&self) -> Result<()> {
        self.store.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FileStateStore, MemoryStateStore};
    use tempfile::tempdir;

    const KEY: &str = "861396533622_6719";

    #[tokio::test]
    async fn first_observation_is_a_change() {
        let cache = StatusCache::new(Box::new(MemoryStateStore::new()));
        let event = StatusEvent::new("01/01/2024 10:00", "Delivered");

        let outcome = cache.check_and_update(KEY, Some(&event)).await.unwrap();
        assert_eq!(outcome, CacheOutcome::Changed { previous: None });
        assert_eq!(
            cache.last_status(KEY).await.unwrap().as_deref(),
            Some("01/01/2024 10:00|Delivered")
        );
    }

    #[tokio::test]
    async fn both_absent_is_unchanged() {
        let cache = StatusCache::new(Box::new(MemoryStateStore::new()));
        assert_eq!(
            cache.check_and_update(KEY, None).await.unwrap(),
            CacheOutcome::Unchanged
        );
    }

    #[tokio::test]
    async fn vanished_status_removes_key() {
        let store = MemoryStateStore::new();
        let cache = StatusCache::new(Box::new(store.clone()));
        let event = StatusEvent::new("01/01/2024 10:00", "Delivered");

        cache.check_and_update(KEY, Some(&event)).await.unwrap();
        let outcome = cache.check_and_update(KEY, None).await.unwrap();

        assert_eq!(
            outcome,
            CacheOutcome::Changed {
                previous: Some("01/01/2024 10:00|Delivered".to_string())
            }
        );
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn repeated_event_writes_file_only_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last_status.json");
        let cache = StatusCache::new(Box::new(FileStateStore::new(&path).await.unwrap()));
        let event = StatusEvent::new("01/01/2024 10:00", "Delivered");

        assert!(cache.check_and_update(KEY, Some(&event)).await.unwrap().is_changed());
        let written = std::fs::read_to_string(&path).unwrap();

        assert_eq!(
            cache.check_and_update(KEY, Some(&event)).await.unwrap(),
            CacheOutcome::Unchanged
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), written);
    }

    #[tokio::test]
    async fn persisted_mapping_survives_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last_status.json");
        let first = StatusEvent::new("01/01/2024 10:00", "Delivered");
        let second = StatusEvent::new("31/12/2023 08:15", "Out for delivery");

        {
            let cache = StatusCache::new(Box::new(FileStateStore::new(&path).await.unwrap()));
            cache.check_and_update("111_1111", Some(&first)).await.unwrap();
            cache.check_and_update("222_2222", Some(&second)).await.unwrap();
        }

        let reloaded = StatusCache::new(Box::new(FileStateStore::new(&path).await.unwrap()));
        assert_eq!(
            reloaded.last_status("111_1111").await.unwrap(),
            Some(first.cache_value())
        );
        assert_eq!(
            reloaded.last_status("222_2222").await.unwrap(),
            Some(second.cache_value())
        );
        assert_eq!(
            reloaded.check_and_update("111_1111", Some(&first)).await.unwrap(),
            CacheOutcome::Unchanged
        );
    }

    #[tokio::test]
    async fn concurrent_updates_keep_one_entry() {
        let cache = std::sync::Arc::new(StatusCache::new(Box::new(MemoryStateStore::new())));

        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                let event = StatusEvent::new(format!("t{}", i), "d");
                cache.check_and_update(KEY, Some(&event)).await.unwrap()
            }));
        }
        let mut changed = 0;
        for handle in handles {
            if handle.await.unwrap().is_changed() {
                changed += 1;
            }
        }

        // Every distinct value is a change relative to its predecessor
        assert_eq!(changed, 8);
        let stored = cache.last_status(KEY).await.unwrap().unwrap();
        assert!(stored.starts_with('t') && stored.ends_with("|d"));
    }
}
