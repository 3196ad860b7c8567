//! JSON output structures for the ftpmirror CLI

use ftpmirror_sync::SyncResult;
use ftpmirror_types::SyncStats;
use serde::{Deserialize, Serialize};

/// Complete JSON report of a mirror run
#[derive(Debug, Serialize, Deserialize)]
pub struct MirrorReportJson {
    /// Operation metadata
    pub metadata: OperationMetadata,
    /// Run statistics, absent when the run failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SyncStatsJson>,
    /// Relative paths uploaded
    pub uploaded: Vec<String>,
    /// Relative paths deleted from the remote
    pub deleted: Vec<String>,
    /// Overall result
    pub result: OperationResult,
}

/// Operation metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationMetadata {
    /// ftpmirror version
    pub version: String,
    /// Timestamp when the report was produced
    pub timestamp: String,
    /// Local directory mirrored
    pub local_root: String,
    /// FTP server
    pub host: String,
    /// Remote document root
    pub document_root: String,
}

impl OperationMetadata {
    /// Metadata stamped with the current time
    pub fn new(local_root: String, host: String, document_root: String) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            local_root,
            host,
            document_root,
        }
    }
}

/// Mirror statistics in JSON format
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncStatsJson {
    pub files_scanned: u64,
    pub files_uploaded: u64,
    pub bytes_uploaded: u64,
    pub files_unchanged: u64,
    pub directories_created: u64,
    pub directory_changes: u64,
    pub parent_moves: u64,
    pub orphans_found: u64,
    pub orphans_deleted: u64,
    pub duration_seconds: f64,
    pub transfer_rate_bytes_per_second: f64,
    pub time_offset_seconds: i64,
    pub used_mlst: bool,
}

/// Outcome of the run
#[derive(Debug, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
}

impl MirrorReportJson {
    /// Report for a completed run
    pub fn success(metadata: OperationMetadata, result: &SyncResult) -> Self {
        let message = if result.stats.is_noop() {
            "Remote is already up to date".to_string()
        } else {
            format!(
                "Uploaded {} files, deleted {}",
                result.stats.files_uploaded, result.stats.orphans_deleted
            )
        };

        Self {
            metadata,
            stats: Some(SyncStatsJson::from_result(result)),
            uploaded: result.uploaded.clone(),
            deleted: result.deleted.clone(),
            result: OperationResult {
                success: true,
                message,
            },
        }
    }

    /// Report for a run that stopped with `error`
    pub fn failure(metadata: OperationMetadata, error: &anyhow::Error) -> Self {
        Self {
            metadata,
            stats: None,
            uploaded: Vec::new(),
            deleted: Vec::new(),
            result: OperationResult {
                success: false,
                message: format!("{:#}", error),
            },
        }
    }
}

impl SyncStatsJson {
    /// Flatten a run result
    pub fn from_result(result: &SyncResult) -> Self {
        let SyncStats {
            files_scanned,
            files_uploaded,
            bytes_uploaded,
            files_unchanged,
            directories_created,
            directory_changes,
            parent_moves,
            orphans_found,
            orphans_deleted,
            duration,
        } = result.stats.clone();

        Self {
            files_scanned,
            files_uploaded,
            bytes_uploaded,
            files_unchanged,
            directories_created,
            directory_changes,
            parent_moves,
            orphans_found,
            orphans_deleted,
            duration_seconds: duration.as_secs_f64(),
            transfer_rate_bytes_per_second: result.stats.transfer_rate(),
            time_offset_seconds: result.time_offset.as_secs(),
            used_mlst: result.used_mlst,
        }
    }
}
