//! State store implementations

pub mod file;
pub mod memory;

pub use file::FileStateStore;
pub use memory::MemoryStateStore;

use crate::config::StateStoreConfig;
use crate::error::Result;
use crate::traits::StateStore;

/// Open the store described by `config`
pub async fn open(config: &StateStoreConfig) -> Result<Box<dyn StateStore>> {
    match config {
        StateStoreConfig::File { path } => Ok(Box::new(FileStateStore::new(path).await?)),
        StateStoreConfig::Memory => Ok(Box::new(MemoryStateStore::new())),
    }
}
