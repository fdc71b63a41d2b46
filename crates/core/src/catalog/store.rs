//! Shared handle to the active snapshot.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::error::{EngineError, EngineResult};

use super::SdeSnapshot;

/// Thread-safe holder of the current snapshot.
///
/// Readers clone the inner `Arc` and keep computing against it even if a
/// refresh swaps in a newer snapshot meanwhile.
#[derive(Clone, Default)]
pub struct CatalogStore {
    inner: Arc<RwLock<Option<Arc<SdeSnapshot>>>>,
}

impl CatalogStore {
    /// Create an empty store; computation is refused until a snapshot is loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `snapshot`.
    pub fn with_snapshot(snapshot: SdeSnapshot) -> Self {
        let store = Self::new();
        store.replace(snapshot);
        store
    }

    /// Snapshot to use for one request.
    pub fn current(&self) -> EngineResult<Arc<SdeSnapshot>> {
        self.inner
            .read()
            .as_ref()
            .cloned()
            .ok_or(EngineError::SnapshotUnavailable)
    }

    /// Swap in a new snapshot, returning the previous one.
    pub fn replace(&self, snapshot: SdeSnapshot) -> Option<Arc<SdeSnapshot>> {
        let snapshot = Arc::new(snapshot);
        info!(version = snapshot.version(), "activating SDE snapshot");
        self.inner.write().replace(snapshot)
    }

    /// Version of the loaded snapshot, if any.
    pub fn version(&self) -> Option<String> {
        self.inner
            .read()
            .as_ref()
            .map(|snapshot| snapshot.version().to_string())
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.read().is_some()
    }
}
