use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, Utc};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::{
    catalog::{CatalogStore, SdeSnapshot},
    config::AppConfig,
    manifest::{self, SnapshotMetadata},
};

use super::file::SnapshotFile;

/// Events emitted by the background snapshot refresh.
#[derive(Debug)]
pub enum SyncEvent {
    /// A new snapshot was stored and activated.
    Updated {
        /// Version of the activated snapshot.
        version: String,
    },
    /// The source still serves the stored version.
    UpToDate,
    /// Refresh failed; the previous snapshot stays active.
    Error(anyhow::Error),
}

/// Coordinates fetching, storing, and activating SDE snapshots.
#[derive(Clone)]
pub struct SdeSync {
    config: AppConfig,
    store: CatalogStore,
    client: reqwest::Client,
    refresh_lock: Arc<Mutex<()>>,
}

impl SdeSync {
    /// Create a synchroniser that activates snapshots in `store`.
    pub fn new(config: AppConfig, store: CatalogStore) -> Self {
        Self {
            config,
            store,
            client: reqwest::Client::new(),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Path to the stored snapshot document.
    pub fn snapshot_path(&self) -> PathBuf {
        SnapshotFile::in_dir(self.config.sde_dir()).path().to_path_buf()
    }

    fn manifest_path(&self) -> PathBuf {
        manifest::manifest_path(self.config.sde_dir())
    }

    /// Manifest of the stored snapshot, if one was written.
    pub fn metadata(&self) -> Result<Option<SnapshotMetadata>> {
        SnapshotMetadata::load(self.manifest_path())
    }

    /// Activate the stored snapshot, fetching one first when none exists.
    pub async fn prepare(&self) -> Result<SnapshotMetadata> {
        let file = SnapshotFile::new(self.snapshot_path());
        let stored = if file.exists() {
            match file.load() {
                Ok(snapshot) => Some(snapshot),
                Err(err) if self.config.sde_source.is_some() => {
                    warn!("stored SDE snapshot is unusable, refetching: {err:#}");
                    None
                }
                Err(err) => return Err(err),
            }
        } else {
            None
        };

        if let Some(snapshot) = stored {
            self.store.replace(snapshot);
        } else if self.config.sde_source.is_some() {
            info!("no local SDE snapshot, fetching from source");
            self.refresh().await?;
        } else {
            warn!("no SDE snapshot stored and no sde_source configured");
        }

        Ok(self.metadata()?.unwrap_or_default())
    }

    /// Whether the stored snapshot is missing or older than the configured age.
    pub fn update_needed(&self) -> Result<bool> {
        if !SnapshotFile::new(self.snapshot_path()).exists() {
            return Ok(true);
        }
        let max_age = Duration::hours(self.config.sde_max_age_hours as i64);
        Ok(self
            .metadata()?
            .map_or(true, |metadata| metadata.is_stale(max_age, Utc::now())))
    }

    /// Fetch the configured source and activate it if its version changed.
    ///
    /// Returns `true` when a new snapshot was activated.
    pub async fn refresh(&self) -> Result<bool> {
        let _guard = self.refresh_lock.lock().await;
        let source = self
            .config
            .sde_source
            .as_deref()
            .ok_or_else(|| anyhow!("no SDE source configured; set sde_source in config.toml"))?;

        info!(source, "refreshing SDE snapshot");
        let bytes = self.fetch(source).await?;
        let snapshot = SdeSnapshot::from_json(&bytes)
            .with_context(|| format!("invalid SDE snapshot from {source}"))?;

        let file = SnapshotFile::new(self.snapshot_path());
        let stored_version = self.metadata()?.and_then(|metadata| metadata.version);
        let unchanged = stored_version.as_deref() == Some(snapshot.version())
            && self.stored_matches(&file, snapshot.version());

        let metadata = SnapshotMetadata {
            version: Some(snapshot.version().to_string()),
            source: Some(source.to_string()),
            updated_at: Some(Utc::now()),
        };

        if unchanged {
            metadata.persist(self.manifest_path())?;
            info!(version = snapshot.version(), "SDE snapshot already up to date");
            if !self.store.is_loaded() {
                self.store.replace(snapshot);
            }
            return Ok(false);
        }

        file.write(&snapshot)?;
        metadata.persist(self.manifest_path())?;
        self.store.replace(snapshot);
        Ok(true)
    }

    // A manifest match only counts when the stored document is intact.
    fn stored_matches(&self, file: &SnapshotFile, version: &str) -> bool {
        if !file.exists() {
            return false;
        }
        match file.load() {
            Ok(stored) => stored.version() == version,
            Err(err) => {
                warn!("stored SDE snapshot is unusable, rewriting: {err:#}");
                false
            }
        }
    }

    /// Refresh in the background, reporting the outcome on `sender`.
    pub async fn run(self, sender: mpsc::Sender<SyncEvent>) -> Result<()> {
        match self.refresh().await {
            Ok(true) => {
                let version = self.store.version().unwrap_or_default();
                sender
                    .send(SyncEvent::Updated { version })
                    .await
                    .context("failed to send sync success event")?;
            }
            Ok(false) => {
                sender
                    .send(SyncEvent::UpToDate)
                    .await
                    .context("failed to send sync success event")?;
            }
            Err(err) => {
                let _ = sender.send(SyncEvent::Error(err)).await;
            }
        }

        Ok(())
    }

    async fn fetch(&self, source: &str) -> Result<Vec<u8>> {
        if source.starts_with("http://") || source.starts_with("https://") {
            let response = self
                .client
                .get(source)
                .send()
                .await
                .with_context(|| format!("failed to download SDE snapshot from {source}"))?
                .error_for_status()
                .with_context(|| format!("SDE download from {source} was rejected"))?;
            let bytes = response
                .bytes()
                .await
                .with_context(|| format!("failed to read SDE snapshot body from {source}"))?;
            return Ok(bytes.to_vec());
        }

        let path = source.strip_prefix("file://").unwrap_or(source);
        tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read SDE snapshot {path}"))
    }
}
