// # File State Store
//
// The status cache on disk: one flat JSON object mapping tracking keys to
// their last-seen serialized status.
//
// ```json
// {
//   "861396533622_6719": "01/01/2024 10:00|Delivered"
// }
// ```
//
// The file is read once at startup and rewritten in full after every
// change. Writes go to `<file>.tmp` and are renamed into place; the
// previous file is kept as `<file>.bak` and used when the main file no
// longer parses.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::Error;
use crate::traits::StateStore;

/// File-backed status map
///
/// # Example
///
/// ```rust,no_run
/// use parcel_core::state::FileStateStore;
/// use parcel_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("last_status.json").await?;
///     store.set_status("861396533622_6719", "01/01/2024 10:00|Delivered").await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    snapshot: RwLock<Snapshot>,
}

#[derive(Debug, Default)]
struct Snapshot {
    /// Sorted so identical maps serialize to identical files
    statuses: BTreeMap<String, String>,
    /// Set while state recovered from the backup is not yet on disk
    unsaved: bool,
}

impl FileStateStore {
    /// Open the store at `path`, creating the parent directory if needed
    ///
    /// A missing file starts empty. An unparsable file falls back to the
    /// backup, and to an empty map when that is unusable too.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::state_store(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }

        let snapshot = Self::load(&path).await?;
        debug!(
            "Status cache {} opened with {} keys",
            path.display(),
            snapshot.statuses.len()
        );

        Ok(Self {
            path,
            snapshot: RwLock::new(snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(path: &Path) -> Result<Snapshot, Error> {
        let statuses = match read_map(path).await {
            Ok(statuses) => statuses,
            Err(Error::Json(e)) => {
                let backup = sibling(path, "bak");
                warn!("{} is not valid JSON ({}), trying {}", path.display(), e, backup.display());

                match read_map(&backup).await {
                    Ok(statuses) if !statuses.is_empty() => {
                        info!("Recovered {} keys from {}", statuses.len(), backup.display());
                        return Ok(Snapshot {
                            statuses,
                            unsaved: true,
                        });
                    }
                    Ok(_) => {
                        warn!("No usable backup, starting with an empty status cache");
                        BTreeMap::new()
                    }
                    Err(e) => {
                        error!("Backup unreadable ({}), starting with an empty status cache", e);
                        BTreeMap::new()
                    }
                }
            }
            Err(e) => return Err(e),
        };

        Ok(Snapshot {
            statuses,
            unsaved: false,
        })
    }

    /// Rewrite the whole file from `snapshot`
    ///
    /// Runs under the write guard, so two mutations never interleave
    /// between serialization and rename.
    async fn persist(&self, snapshot: &mut Snapshot) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(&snapshot.statuses)?;
        let temp = sibling(&self.path, "tmp");
        fs::write(&temp, json.as_bytes()).await.map_err(|e| {
            Error::state_store(format!("Cannot write {}: {}", temp.display(), e))
        })?;

        if self.path.exists()
            && let Err(e) = fs::copy(&self.path, sibling(&self.path, "bak")).await
        {
            warn!("Cannot back up {}: {}", self.path.display(), e);
        }

        fs::rename(&temp, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Cannot replace {} with {}: {}",
                self.path.display(),
                temp.display(),
                e
            ))
        })?;

        snapshot.unsaved = false;
        debug!("Status cache written to {}", self.path.display());
        Ok(())
    }
}

/// `<path>.<suffix>`, keeping the original extension
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Undo a mutation whose persist failed, so the next check sees the change again
fn restore(snapshot: &mut Snapshot, key: &str, previous: Option<String>) {
    match previous {
        Some(value) => {
            snapshot.statuses.insert(key.to_string(), value);
        }
        None => {
            snapshot.statuses.remove(key);
        }
    }
}

/// Read a status map; parse failures come back as `Error::Json`
async fn read_map(path: &Path) -> Result<BTreeMap<String, String>, Error> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => {
            return Err(Error::state_store(format!(
                "Cannot read {}: {}",
                path.display(),
                e
            )));
        }
    };

    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_str(&content)?)
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get_status(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.snapshot.read().await.statuses.get(key).cloned())
    }

    async fn set_status(&self, key: &str, status: &str) -> Result<(), Error> {
        let mut snapshot = self.snapshot.write().await;
        let previous = snapshot
            .statuses
            .insert(key.to_string(), status.to_string());

        let persisted = self.persist(&mut snapshot).await;
        if persisted.is_err() {
            restore(&mut snapshot, key, previous);
        }
        persisted
    }

    async fn delete_status(&self, key: &str) -> Result<(), Error> {
        let mut snapshot = self.snapshot.write().await;
        let Some(previous) = snapshot.statuses.remove(key) else {
            return Ok(());
        };

        let persisted = self.persist(&mut snapshot).await;
        if persisted.is_err() {
            restore(&mut snapshot, key, Some(previous));
        }
        persisted
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.snapshot.read().await.statuses.keys().cloned().collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        let mut snapshot = self.snapshot.write().await;
        if snapshot.unsaved {
            self.persist(&mut snapshot).await?;
        }
        Ok(())
    }
}
