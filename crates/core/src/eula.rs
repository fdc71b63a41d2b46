//! Persistence of the end-user licence acceptance flag.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// File name of the acceptance record inside the data directory.
pub const EULA_FILE: &str = "eula.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EulaRecord {
    accepted: bool,
    updated_at: DateTime<Utc>,
}

/// Reads and writes the acceptance record.
#[derive(Debug, Clone)]
pub struct EulaStore {
    path: PathBuf,
}

impl EulaStore {
    /// Store rooted at `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(EULA_FILE),
        }
    }

    /// Path of the acceptance record.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the EULA has been accepted. A missing record means "no".
    pub fn accepted(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let record: EulaRecord = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        Ok(record.accepted)
    }

    /// Record acceptance or refusal.
    pub fn set_accepted(&self, accepted: bool) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let record = EulaRecord {
            accepted,
            updated_at: Utc::now(),
        };
        let serialised = serde_json::to_vec_pretty(&record)?;
        fs::write(&self.path, serialised)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        info!(accepted, "recorded EULA decision");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_record_is_not_accepted() -> Result<()> {
        let dir = tempdir()?;
        let store = EulaStore::new(dir.path().join("data"));
        assert!(!store.accepted()?);
        Ok(())
    }

    #[test]
    fn decisions_persist() -> Result<()> {
        let dir = tempdir()?;
        let store = EulaStore::new(dir.path().join("data"));

        store.set_accepted(true)?;
        assert!(store.accepted()?);
        assert!(EulaStore::new(dir.path().join("data")).accepted()?);

        store.set_accepted(false)?;
        assert!(!store.accepted()?);
        Ok(())
    }

    #[test]
    fn corrupt_record_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let store = EulaStore::new(dir.path());
        fs::write(store.path(), "yes")?;
        assert!(store.accepted().is_err());
        Ok(())
    }
}
