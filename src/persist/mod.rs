//! Snapshot storage.
//!
//! A [`SnapshotStore`] wraps one snapshot file and reports every operation
//! as an explicit outcome value rather than a bare `Result`, so callers
//! can distinguish "no snapshot yet" from "the read failed" without poking
//! at error kinds. Writes go through a temp file and rename so a crash
//! mid-save never truncates the previous snapshot.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;

use crate::error::QuillError;

/// Result of a save attempt.
#[derive(Debug)]
pub enum SaveOutcome {
    /// Written to disk at the given wall-clock time in ms.
    Saved { timestamp_ms: u64 },
    Failed(QuillError),
}

/// Result of a load attempt.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(String),
    /// No snapshot exists. A fresh document should be created.
    Empty,
    Failed(QuillError),
}

/// Result of clearing the stored snapshot.
#[derive(Debug)]
pub enum ClearOutcome {
    Cleared,
    Failed(QuillError),
}

pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the snapshot. Failures are logged and reported, never raised;
    /// the editor keeps running with unsaved changes.
    pub fn save(&self, json: &str) -> SaveOutcome {
        match self.write_atomic(json) {
            Ok(()) => SaveOutcome::Saved {
                timestamp_ms: now_ms(),
            },
            Err(source) => {
                warn!(path = %self.path.display(), error = %source, "snapshot save failed");
                SaveOutcome::Failed(QuillError::Write {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    pub fn load(&self) -> LoadOutcome {
        match fs::read_to_string(&self.path) {
            Ok(json) => LoadOutcome::Loaded(json),
            Err(source) if source.kind() == io::ErrorKind::NotFound => LoadOutcome::Empty,
            Err(source) => {
                warn!(path = %self.path.display(), error = %source, "snapshot load failed");
                LoadOutcome::Failed(QuillError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    /// Remove the snapshot. A missing file already counts as cleared.
    pub fn clear(&self) -> ClearOutcome {
        match fs::remove_file(&self.path) {
            Ok(()) => ClearOutcome::Cleared,
            Err(source) if source.kind() == io::ErrorKind::NotFound => ClearOutcome::Cleared,
            Err(source) => {
                warn!(path = %self.path.display(), error = %source, "snapshot clear failed");
                ClearOutcome::Failed(QuillError::Write {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    fn write_atomic(&self, json: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)
    }
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
