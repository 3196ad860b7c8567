//! Core data types shared across ftpmirror crates

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Transfer rate in bytes per second
pub type TransferRate = f64;

/// Clock skew between the local machine and the remote server, in seconds.
///
/// Computed once per run as `local_time - remote_time` and added to every raw remote
/// modification time so both sides compare in the local clock's frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeOffset(i64);

impl TimeOffset {
    /// No skew
    pub const ZERO: Self = Self(0);

    /// Create an offset from a number of seconds
    pub const fn from_secs(seconds: i64) -> Self {
        Self(seconds)
    }

    /// Derive the offset from a local and a remote reading of the same instant
    pub const fn between(local_time: i64, remote_time: i64) -> Self {
        Self(local_time - remote_time)
    }

    /// Offset in seconds
    pub const fn as_secs(self) -> i64 {
        self.0
    }

    /// Translate a raw remote timestamp into the local clock's frame
    pub const fn apply(self, remote_time: i64) -> i64 {
        remote_time + self.0
    }
}

impl fmt::Display for TimeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}s", self.0)
    }
}

/// Metadata of a remote file as last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RemoteFileMetadata {
    /// Modification time in epoch seconds, already corrected by the [`TimeOffset`]
    pub modified: i64,
    /// Size in bytes
    pub size: u64,
}

impl RemoteFileMetadata {
    /// Build metadata from a raw remote timestamp, applying the clock offset
    pub const fn from_raw(raw_modified: i64, size: u64, offset: TimeOffset) -> Self {
        Self {
            modified: offset.apply(raw_modified),
            size,
        }
    }

    /// Decide whether a local file with the given metadata must be uploaded over this one.
    ///
    /// The local tree is authoritative: a newer local file or any size difference wins.
    /// A remote file that is newer but the same size is left alone.
    pub const fn needs_upload(&self, local_modified: i64, local_size: u64) -> bool {
        local_modified > self.modified || local_size != self.size
    }
}

/// Statistics collected over one mirror run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SyncStats {
    /// Local files considered after filtering
    pub files_scanned: u64,
    /// Files uploaded
    pub files_uploaded: u64,
    /// Bytes uploaded
    pub bytes_uploaded: u64,
    /// Files found up to date on the remote
    pub files_unchanged: u64,
    /// Remote directories created
    pub directories_created: u64,
    /// "Change directory" commands issued while navigating
    pub directory_changes: u64,
    /// "Move to parent" commands issued while navigating
    pub parent_moves: u64,
    /// Orphan candidates found while indexing the remote
    pub orphans_found: u64,
    /// Orphaned remote files deleted
    pub orphans_deleted: u64,
    /// Total duration of the run
    pub duration: Duration,
}

impl SyncStats {
    /// Create a new empty statistics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate the overall upload rate
    pub fn transfer_rate(&self) -> TransferRate {
        if self.duration.as_secs_f64() > 0.0 {
            self.bytes_uploaded as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Whether the run changed anything on the remote
    pub fn is_noop(&self) -> bool {
        self.files_uploaded == 0 && self.orphans_deleted == 0 && self.directories_created == 0
    }
}
