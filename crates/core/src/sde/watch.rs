use std::{
    ffi::{OsStr, OsString},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::catalog::CatalogStore;

use super::file::SnapshotFile;

/// Reloads the catalog when the snapshot document is replaced on disk.
///
/// Watching stops when the value is dropped.
pub struct SnapshotWatcher {
    _watcher: RecommendedWatcher,
}

impl SnapshotWatcher {
    /// Watch `snapshot_path` and activate new versions in `store`.
    pub fn spawn(snapshot_path: impl Into<PathBuf>, store: CatalogStore) -> Result<Self> {
        let snapshot_path = snapshot_path.into();
        let dir = snapshot_path
            .parent()
            .ok_or_else(|| anyhow!("snapshot path {} has no parent", snapshot_path.display()))?
            .to_path_buf();
        let file_name: OsString = snapshot_path
            .file_name()
            .ok_or_else(|| anyhow!("snapshot path {} has no file name", snapshot_path.display()))?
            .to_os_string();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create snapshot directory {}", dir.display()))?;

        let target = snapshot_path.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if is_snapshot_change(&event, &file_name) {
                    reload(&target, &store);
                }
            }
            Err(err) => warn!("snapshot watcher error: {err}"),
        })
        .context("failed to create snapshot watcher")?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", dir.display()))?;
        info!(path = %snapshot_path.display(), "watching SDE snapshot for changes");

        Ok(Self { _watcher: watcher })
    }
}

fn is_snapshot_change(event: &Event, file_name: &OsStr) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == Some(file_name))
}

/// Load the document at `path` into `store` unless that version is already active.
///
/// Returns whether a new snapshot was activated.
fn reload(path: &Path, store: &CatalogStore) -> bool {
    match SnapshotFile::new(path).load() {
        Ok(snapshot) => {
            if store.version().as_deref() == Some(snapshot.version()) {
                debug!(version = snapshot.version(), "snapshot change already active");
                return false;
            }
            store.replace(snapshot);
            true
        }
        Err(err) => {
            warn!("failed to reload SDE snapshot: {err:#}");
            false
        }
    }
}
