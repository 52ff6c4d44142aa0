// # Memory State Store
//
// Nothing survives a restart: the first poll afterwards treats the current
// status as new and notifies once.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::StateStore;

/// In-memory status map; clones share the same map
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    statuses: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.statuses.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.statuses.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_status(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.statuses.read().await.get(key).cloned())
    }

    async fn set_status(&self, key: &str, status: &str) -> Result<(), Error> {
        self.statuses
            .write()
            .await
            .insert(key.to_string(), status.to_string());
        Ok(())
    }

    async fn delete_status(&self, key: &str) -> Result<(), Error> {
        self.statuses.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.statuses.read().await.keys().cloned().collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}
