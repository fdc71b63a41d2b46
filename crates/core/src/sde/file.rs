use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::catalog::SdeSnapshot;

/// File name of the snapshot document inside the SDE directory.
pub const SNAPSHOT_FILE: &str = "snapshot.json";

/// Snapshot document stored on disk.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Handle for the document at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Document inside an SDE directory.
    pub fn in_dir(sde_dir: impl AsRef<Path>) -> Self {
        Self::new(sde_dir.as_ref().join(SNAPSHOT_FILE))
    }

    /// Location of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a document has been written.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read and validate the document.
    pub fn load(&self) -> Result<SdeSnapshot> {
        let bytes = fs::read(&self.path)
            .with_context(|| format!("failed to read snapshot {}", self.path.display()))?;
        let snapshot = SdeSnapshot::from_json(&bytes)
            .with_context(|| format!("failed to load snapshot {}", self.path.display()))?;
        debug!(
            version = snapshot.version(),
            skills = snapshot.skill_count(),
            "loaded SDE snapshot from disk"
        );
        Ok(snapshot)
    }

    /// Replace the document atomically so readers never observe a partial file.
    pub fn write(&self, snapshot: &SdeSnapshot) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| anyhow!("snapshot path {} has no parent", self.path.display()))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create snapshot directory {}", parent.display()))?;

        let serialised = serde_json::to_vec(&snapshot.to_document())
            .context("failed to serialize SDE snapshot")?;
        let mut temp = NamedTempFile::new_in(parent)
            .with_context(|| format!("failed to create temporary file in {}", parent.display()))?;
        temp.write_all(&serialised)
            .context("failed to write temporary snapshot")?;
        temp.as_file()
            .sync_all()
            .context("failed to flush temporary snapshot")?;
        temp.persist(&self.path)
            .with_context(|| format!("failed to replace snapshot {}", self.path.display()))?;
        Ok(())
    }
}
