// Algorithm catalog held by the reference backend

use std::path::{Path, PathBuf};

use tokio::sync::RwLock;
use tracing::{debug, info};

use super::history::write_atomic;
use crate::models::AlgorithmReference;
use crate::{PatAgentError, Result};

/// The known-algorithm database, optionally backed by a JSON file.
///
/// Entries added at runtime are written back to the file when there is one.
#[derive(Default)]
pub struct AlgorithmCatalog {
    entries: RwLock<Vec<AlgorithmReference>>,
    path: Option<PathBuf>,
}

impl AlgorithmCatalog {
    pub fn new(entries: Vec<AlgorithmReference>) -> Self {
        Self {
            entries: RwLock::new(entries),
            path: None,
        }
    }

    /// Load from `path`; a missing file starts an empty catalog that will be created on first add
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                PatAgentError::Configuration(format!("algorithm database {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        debug!("Loaded {} algorithms from {}", entries.len(), path.display());
        Ok(Self {
            entries: RwLock::new(entries),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn entries(&self) -> Vec<AlgorithmReference> {
        self.entries.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<AlgorithmReference> {
        self.entries.read().await.iter().find(|e| e.id == id).cloned()
    }

    /// Append an entry and persist the catalog.
    ///
    /// Fails with [`PatAgentError::Conflict`] when the id is taken. The entry is
    /// only visible once the file write has succeeded.
    pub async fn add(&self, entry: AlgorithmReference) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.id == entry.id) {
            return Err(PatAgentError::Conflict(format!(
                "Algorithm {} already exists",
                entry.id
            )));
        }
        if let Some(path) = &self.path {
            let mut updated = entries.clone();
            updated.push(entry);
            let text = serde_json::to_string_pretty(&updated)?;
            write_atomic(path, text.as_bytes()).await?;
            *entries = updated;
            info!("Algorithm database now holds {} entries", entries.len());
        } else {
            entries.push(entry);
        }
        Ok(())
    }
}
