//! Session snapshot persistence as JSON on disk

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use synthgrid_core::SessionSnapshot;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read and parse a JSON document
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PersistenceError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Loads and saves the whole-session snapshot at a fixed path
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn try_load(&self) -> Result<SessionSnapshot, PersistenceError> {
        read_json(&self.path)
    }

    /// Load the stored session. A missing or unreadable file gives the
    /// default empty session.
    pub fn load(&self) -> SessionSnapshot {
        match self.try_load() {
            Ok(snapshot) => {
                info!(path = %self.path.display(), clips = snapshot.clips.len(), "Loaded session");
                snapshot
            }
            Err(PersistenceError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No saved session, starting empty");
                SessionSnapshot::default()
            }
            Err(e) => {
                warn!(path = %self.path.display(), "Failed to load session, starting empty: {e}");
                SessionSnapshot::default()
            }
        }
    }

    /// Write the snapshot, replacing the stored file only once the new
    /// contents are fully written
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        info!(path = %self.path.display(), clips = snapshot.clips.len(), "Saved session");
        Ok(())
    }
}
