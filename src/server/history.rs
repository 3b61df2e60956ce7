// History storage for the reference backend
// One interaction list per history channel

//! # History Storage
//!
//! The backend keeps one ordered interaction list per [`HistoryChannel`].
//! [`HistoryStorage`] is the repository interface; [`InMemoryHistory`] serves
//! tests and throwaway sessions, [`FileHistory`] keeps one JSON file per
//! channel in a directory.
//!
//! `HistoryChannel::Skip` is never stored: loading it yields an empty list and
//! appending to it is a no-op.
//!
//! ## Rust Learning Notes:
//!
//! ### Async Traits
//! The `async-trait` crate lets the trait declare `async fn`s, so both
//! backends can be used as `Arc<dyn HistoryStorage>`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::models::{HistoryChannel, Interaction};
use crate::{PatAgentError, Result};

/// Repository interface for chat histories
#[async_trait::async_trait]
pub trait HistoryStorage: Send + Sync {
    /// The full list for a channel; empty if nothing was recorded yet
    async fn load(&self, channel: HistoryChannel) -> Result<Vec<Interaction>>;

    /// Append one interaction and return the updated list
    async fn append(&self, channel: HistoryChannel, interaction: Interaction) -> Result<Vec<Interaction>>;

    /// Remove the interaction at `index`.
    ///
    /// `Ok(None)` when the index is out of range; the list is left untouched.
    async fn delete(&self, channel: HistoryChannel, index: usize) -> Result<Option<Vec<Interaction>>>;
}

/// Histories held in memory
#[derive(Default)]
pub struct InMemoryHistory {
    channels: RwLock<HashMap<HistoryChannel, Vec<Interaction>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `interactions` in `channel`
    pub fn with_interactions(channel: HistoryChannel, interactions: Vec<Interaction>) -> Self {
        let mut channels = HashMap::new();
        if channel.is_persisted() {
            channels.insert(channel, interactions);
        }
        Self {
            channels: RwLock::new(channels),
        }
    }
}

#[async_trait::async_trait]
impl HistoryStorage for InMemoryHistory {
    async fn load(&self, channel: HistoryChannel) -> Result<Vec<Interaction>> {
        let channels = self.channels.read().await;
        Ok(channels.get(&channel).cloned().unwrap_or_default())
    }

    async fn append(&self, channel: HistoryChannel, interaction: Interaction) -> Result<Vec<Interaction>> {
        if !channel.is_persisted() {
            return Ok(Vec::new());
        }
        let mut channels = self.channels.write().await;
        let list = channels.entry(channel).or_default();
        list.push(interaction);
        Ok(list.clone())
    }

    async fn delete(&self, channel: HistoryChannel, index: usize) -> Result<Option<Vec<Interaction>>> {
        let mut channels = self.channels.write().await;
        match channels.get_mut(&channel) {
            Some(list) if index < list.len() => {
                list.remove(index);
                Ok(Some(list.clone()))
            }
            _ => Ok(None),
        }
    }
}

/// Histories stored as `<dir>/<channel file>.json`.
///
/// A missing file counts as an empty history. A file that does not parse
/// reads as empty through [`HistoryStorage::load`], but `append` and `delete`
/// refuse to touch it so its content survives for manual repair. Writes go
/// through a temp file and a rename, serialized through one lock so
/// concurrent appends cannot drop entries.
pub struct FileHistory {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileHistory {
    /// Use `dir`, creating it if needed
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        debug!("History directory: {}", dir.display());
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, channel: HistoryChannel) -> Option<PathBuf> {
        channel.file_name().map(|name| self.dir.join(name))
    }

    /// The stored list, or `None` when the file is missing
    async fn read_strict(&self, path: &Path) -> Result<Option<Vec<Interaction>>> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text).map(Some).map_err(|e| {
            PatAgentError::Storage(format!("unreadable history {}: {}", path.display(), e))
        })
    }

    async fn read_for_update(&self, path: &Path) -> Result<Vec<Interaction>> {
        Ok(self.read_strict(path).await?.unwrap_or_default())
    }

    async fn write(&self, path: &Path, list: &[Interaction]) -> Result<()> {
        let text = serde_json::to_string_pretty(list)?;
        write_atomic(path, text.as_bytes()).await
    }
}

/// Replace `path` with `contents` through a sibling temp file and a rename
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, contents).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[async_trait::async_trait]
impl HistoryStorage for FileHistory {
    async fn load(&self, channel: HistoryChannel) -> Result<Vec<Interaction>> {
        match self.path_for(channel) {
            Some(path) => match self.read_strict(&path).await {
                Ok(list) => Ok(list.unwrap_or_default()),
                Err(PatAgentError::Storage(message)) => {
                    warn!("{}", message);
                    Ok(Vec::new())
                }
                Err(e) => Err(e),
            },
            None => Ok(Vec::new()),
        }
    }

    async fn append(&self, channel: HistoryChannel, interaction: Interaction) -> Result<Vec<Interaction>> {
        let Some(path) = self.path_for(channel) else {
            return Ok(Vec::new());
        };
        let _guard = self.write_lock.lock().await;
        let mut list = self.read_for_update(&path).await?;
        list.push(interaction);
        self.write(&path, &list).await?;
        Ok(list)
    }

    async fn delete(&self, channel: HistoryChannel, index: usize) -> Result<Option<Vec<Interaction>>> {
        let Some(path) = self.path_for(channel) else {
            return Ok(None);
        };
        let _guard = self.write_lock.lock().await;
        let mut list = self.read_for_update(&path).await?;
        if index >= list.len() {
            return Ok(None);
        }
        list.remove(index);
        self.write(&path, &list).await?;
        Ok(Some(list))
    }
}
