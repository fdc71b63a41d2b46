//! SDE snapshot storage and synchronisation.

/// On-disk snapshot document.
pub mod file;
/// Fetching and activating fresh snapshots.
pub mod sync;
/// Reloading snapshots replaced by other processes.
pub mod watch;

pub use file::{SnapshotFile, SNAPSHOT_FILE};
pub use sync::{SdeSync, SyncEvent};
pub use watch::SnapshotWatcher;
