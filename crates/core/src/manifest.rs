//! Manifest stored alongside the SDE snapshot.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Metadata describing the currently stored snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SnapshotMetadata {
    /// Version string declared by the snapshot document.
    pub version: Option<String>,
    /// Source the snapshot was fetched from.
    pub source: Option<String>,
    /// When the snapshot was last written locally.
    pub updated_at: Option<DateTime<Utc>>,
}

impl SnapshotMetadata {
    /// Load metadata from the given path, returning `None` if it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        let metadata = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse manifest {}", path.display()))?;
        Ok(metadata)
    }

    /// Persist metadata to the given file, creating parent directories if needed.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create manifest directory {}", parent.display())
            })?;
        }

        let serialized =
            serde_json::to_string_pretty(self).context("failed to serialize snapshot metadata")?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write manifest {}", path.display()))
    }

    /// Whether the snapshot is older than `max_age` at `now`. Unknown age counts as stale.
    pub fn is_stale(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        match self.updated_at {
            Some(updated_at) => now - updated_at > max_age,
            None => true,
        }
    }
}

/// Helper to compute the manifest path inside a snapshot directory.
pub fn manifest_path(sde_dir: impl AsRef<Path>) -> PathBuf {
    sde_dir.as_ref().join("manifest.json")
}
