//! Progress reporting for mirror runs

use std::fmt;

/// Phases of a mirror run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SyncPhase {
    /// Entering the document root
    Connecting,
    /// Measuring the remote clock offset
    Calibrating,
    /// Negotiating optional server features
    Negotiating,
    /// Listing existing remote files
    IndexingRemote,
    /// Scanning the local tree
    ScanningLocal,
    /// Comparing and uploading files
    Uploading,
    /// Deleting orphaned remote files
    DeletingOrphans,
    /// Run finished
    Completed,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "Entering document root",
            Self::Calibrating => "Calibrating clock",
            Self::Negotiating => "Negotiating features",
            Self::IndexingRemote => "Indexing remote",
            Self::ScanningLocal => "Scanning local tree",
            Self::Uploading => "Uploading",
            Self::DeletingOrphans => "Deleting orphans",
            Self::Completed => "Completed",
        };
        f.write_str(name)
    }
}

/// Receives progress notifications from the engine.
///
/// All methods default to doing nothing, so observers only implement what they display.
pub trait ProgressObserver: Send + Sync {
    /// A new phase has started
    fn phase_changed(&self, _phase: SyncPhase) {}

    /// A remote directory has been listed while indexing
    fn directory_indexed(&self, _path: &str, _entries: usize) {}

    /// The local tree is known
    fn scan_completed(&self, _directories: usize, _files: u64) {}

    /// An upload of `size` bytes is starting
    fn upload_started(&self, _path: &str, _size: u64) {}

    /// A block of a large upload has been sent
    fn block_sent(&self, _path: &str, _bytes: usize) {}

    /// An upload finished
    fn upload_finished(&self, _path: &str, _bytes: u64) {}

    /// A local file was found up to date on the remote
    fn file_unchanged(&self, _path: &str) {}

    /// An orphaned remote file was deleted
    fn file_deleted(&self, _path: &str) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}
