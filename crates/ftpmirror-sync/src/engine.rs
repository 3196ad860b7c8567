//! Main mirroring engine

use crate::{
    calibrate::{calibrate_time_offset, enter_document_root, MARKER_NAME},
    features::negotiate_capabilities,
    filter::PathFilter,
    indexer::RemoteIndexer,
    progress::{NoProgress, ProgressObserver, SyncPhase},
    scanner::{split_segments, FileTreeEntry, LocalTreeScanner},
    session::MirrorSession,
};
use filetime::FileTime;
use ftpmirror_types::{Error, RemoteTransport, Result, SyncStats, TimeOffset};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tracing::{debug, info};

/// Size of the blocks files are uploaded in
pub const BLOCK_SIZE: usize = 32760;

/// Mirror request
#[derive(Debug, Clone)]
pub struct SyncRequest {
    /// Local directory that is mirrored
    pub local_root: PathBuf,
    /// Remote directory, relative to the login directory, that receives the mirror
    pub document_root: String,
    /// Explicit files to consider instead of walking the whole local root
    pub files: Option<Vec<String>>,
    /// Mirror options
    pub options: SyncOptions,
}

impl SyncRequest {
    /// Create a request mirroring the whole of `local_root`
    pub fn new<P: AsRef<Path>, S: Into<String>>(local_root: P, document_root: S) -> Self {
        Self {
            local_root: local_root.as_ref().to_path_buf(),
            document_root: document_root.into(),
            files: None,
            options: SyncOptions::default(),
        }
    }

    /// Only consider the given files, relative to the local root.
    ///
    /// An empty list means "walk the whole tree".
    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = if files.is_empty() { None } else { Some(files) };
        self
    }

    /// Set mirror options
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }
}

/// Mirror options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Delete remote files that have no local counterpart
    pub clean: bool,
    /// Patterns of paths left out of the mirror
    pub excludes: Vec<String>,
    /// Patterns of remote paths never deleted
    pub keeps: Vec<String>,
    /// Upload block size in bytes
    pub block_size: usize,
    /// Name of the clock calibration marker
    pub marker_name: String,
}

impl SyncOptions {
    /// Options for a mirror that also removes orphaned remote files
    pub fn mirror() -> Self {
        Self {
            clean: true,
            ..Default::default()
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            clean: false,
            excludes: Vec::new(),
            keeps: Vec::new(),
            block_size: BLOCK_SIZE,
            marker_name: MARKER_NAME.to_string(),
        }
    }
}

/// Mirror result
#[derive(Debug, Clone)]
pub struct SyncResult {
    /// Run statistics
    pub stats: SyncStats,
    /// Relative paths uploaded, in upload order
    pub uploaded: Vec<String>,
    /// Relative paths deleted from the remote, in deletion order
    pub deleted: Vec<String>,
    /// Measured clock offset
    pub time_offset: TimeOffset,
    /// Whether metadata came from single `MLST` queries
    pub used_mlst: bool,
}

/// One-way mirroring engine
pub struct SyncEngine {
    request: SyncRequest,
    filter: PathFilter,
    progress: Arc<dyn ProgressObserver>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("request", &self.request)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Create an engine for `request`, compiling its patterns.
    ///
    /// Invalid patterns and options are reported here, before any network activity.
    pub fn new(request: SyncRequest) -> Result<Self> {
        if request.options.block_size == 0 {
            return Err(Error::config("block size must be positive"));
        }
        if request.options.marker_name.is_empty() || request.options.marker_name.contains('/') {
            return Err(Error::config(format!(
                "invalid marker name '{}'",
                request.options.marker_name
            )));
        }

        let filter = PathFilter::new(&request.options.excludes, &request.options.keeps)?
            .with_excluded_name(&request.options.marker_name)?;

        Ok(Self {
            request,
            filter,
            progress: Arc::new(NoProgress),
        })
    }

    /// Report progress to `progress`
    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = progress;
        self
    }

    /// The compiled rule set
    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    /// Run the mirror over an established session
    pub async fn sync<T: RemoteTransport>(
        &self,
        session: &mut MirrorSession<T>,
    ) -> Result<SyncResult> {
        let start_time = Instant::now();
        let request = &self.request;
        let options = &request.options;
        let mut stats = SyncStats::new();

        info!(
            "Starting mirror: {} -> /{}",
            request.local_root.display(),
            request.document_root.trim_start_matches('/')
        );
        self.validate_local_root().await?;

        // Phase 1: document root
        self.progress.phase_changed(SyncPhase::Connecting);
        let root_segments = split_segments(&request.document_root);
        stats.directories_created +=
            enter_document_root(session.transport_mut(), &root_segments).await?;
        session.mark_root();

        // Phase 2: clock offset
        self.progress.phase_changed(SyncPhase::Calibrating);
        let offset = calibrate_time_offset(session.transport_mut(), &options.marker_name).await?;
        session.set_offset(offset);

        // Phase 3: optional features
        self.progress.phase_changed(SyncPhase::Negotiating);
        let capabilities = negotiate_capabilities(session.transport_mut()).await;
        session.set_capabilities(capabilities);

        // Phase 4: orphan candidates
        let mut orphans = if options.clean {
            self.progress.phase_changed(SyncPhase::IndexingRemote);
            let indexer = RemoteIndexer::new(&self.filter, self.progress.as_ref());
            Some(indexer.index(session.transport_mut()).await?)
        } else {
            None
        };
        stats.orphans_found = orphans.as_ref().map_or(0, |o| o.len() as u64);

        // Phase 5: local tree
        self.progress.phase_changed(SyncPhase::ScanningLocal);
        let tree = self.scan_local_tree().await?;
        stats.files_scanned = tree.iter().map(|e| e.files.len() as u64).sum();
        self.progress.scan_completed(tree.len(), stats.files_scanned);

        // Phase 6: walk and upload
        self.progress.phase_changed(SyncPhase::Uploading);
        let mut uploaded = Vec::new();
        for entry in &tree {
            session.goto_path(&entry.segments()).await?;
            for name in &entry.files {
                let relative = entry.file_path(name);
                if let Some(orphans) = orphans.as_mut() {
                    orphans.remove(&relative);
                }

                if let Some(bytes) = self.sync_file(session, name, &relative).await? {
                    stats.files_uploaded += 1;
                    stats.bytes_uploaded += bytes;
                    uploaded.push(relative);
                } else {
                    stats.files_unchanged += 1;
                }
            }
        }

        // Phase 7: orphans
        let mut deleted = Vec::new();
        if let Some(orphans) = orphans {
            self.progress.phase_changed(SyncPhase::DeletingOrphans);
            deleted = self.delete_orphans(session, orphans).await?;
            stats.orphans_deleted = deleted.len() as u64;
        }

        let navigator = session.navigator();
        stats.directories_created += navigator.directories_created();
        stats.directory_changes = navigator.directory_changes();
        stats.parent_moves = navigator.parent_moves();
        stats.duration = start_time.elapsed();
        self.progress.phase_changed(SyncPhase::Completed);

        info!(
            "Mirror completed: {} uploaded ({} bytes), {} unchanged, {} deleted in {:?}",
            stats.files_uploaded,
            stats.bytes_uploaded,
            stats.files_unchanged,
            stats.orphans_deleted,
            stats.duration
        );

        Ok(SyncResult {
            stats,
            uploaded,
            deleted,
            time_offset: offset,
            used_mlst: capabilities.mlst_modify_size,
        })
    }

    async fn validate_local_root(&self) -> Result<()> {
        let root = &self.request.local_root;
        let metadata = fs::metadata(root)
            .await
            .map_err(|e| Error::local_file(root, &e))?;
        if !metadata.is_dir() {
            return Err(Error::LocalFile {
                path: root.clone(),
                message: "not a directory".to_string(),
            });
        }
        Ok(())
    }

    async fn scan_local_tree(&self) -> Result<Vec<FileTreeEntry>> {
        let root = self.request.local_root.clone();
        let files = self.request.files.clone();
        let filter = self.filter.clone();

        tokio::task::spawn_blocking(move || {
            LocalTreeScanner::new(&root, &filter).scan(files.as_deref())
        })
        .await
        .map_err(|e| Error::Io {
            message: format!("local scan task failed: {}", e),
        })?
    }

    /// Compare one file against the remote and upload it if needed.
    ///
    /// Returns the number of bytes uploaded, or `None` when the remote copy is current.
    async fn sync_file<T: RemoteTransport>(
        &self,
        session: &mut MirrorSession<T>,
        name: &str,
        relative: &str,
    ) -> Result<Option<u64>> {
        let local_path = self.request.local_root.join(relative);
        let metadata = fs::metadata(&local_path)
            .await
            .map_err(|e| Error::local_file(&local_path, &e))?;
        let local_modified = FileTime::from_last_modification_time(&metadata).unix_seconds();
        let local_size = metadata.len();

        let remote = session.remote_metadata(name).await?;
        let needs_upload = remote.map_or(true, |r| r.needs_upload(local_modified, local_size));
        if !needs_upload {
            debug!("Unchanged {}", relative);
            self.progress.file_unchanged(relative);
            return Ok(None);
        }

        info!("uploading {}", relative);
        self.progress.upload_started(relative, local_size);

        let mut file = fs::File::open(&local_path)
            .await
            .map_err(|e| Error::local_file(&local_path, &e))?;
        let block_size = self.request.options.block_size;
        let report_blocks = local_size > block_size as u64;
        let progress = self.progress.as_ref();
        let mut on_block = |bytes: usize| {
            if report_blocks {
                progress.block_sent(relative, bytes);
            }
        };

        let sent = session
            .transport_mut()
            .store_file(name, &mut file, block_size, &mut on_block)
            .await?;

        self.progress.upload_finished(relative, sent);
        Ok(Some(sent))
    }

    async fn delete_orphans<T: RemoteTransport>(
        &self,
        session: &mut MirrorSession<T>,
        orphans: BTreeSet<String>,
    ) -> Result<Vec<String>> {
        session.goto_path(&[]).await?;

        let mut deleted = Vec::with_capacity(orphans.len());
        for path in orphans {
            info!("deleting {}", path);
            session.transport_mut().delete_file(&path).await?;
            self.progress.file_deleted(&path);
            deleted.push(path);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftpmirror_tests::{LocalTree, MemoryRemote};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProgress {
        phases: Mutex<Vec<SyncPhase>>,
        blocks: Mutex<Vec<(String, usize)>>,
    }

    impl ProgressObserver for RecordingProgress {
        fn phase_changed(&self, phase: SyncPhase) {
            self.phases.lock().unwrap().push(phase);
        }

        fn block_sent(&self, path: &str, bytes: usize) {
            self.blocks.lock().unwrap().push((path.to_string(), bytes));
        }
    }

    #[test]
    fn test_options_defaults() {
        let options = SyncOptions::default();
        assert!(!options.clean);
        assert_eq!(options.block_size, BLOCK_SIZE);
        assert_eq!(options.marker_name, ".timestamp");
        assert!(SyncOptions::mirror().clean);
    }

    #[test]
    fn test_invalid_pattern_rejected_before_connecting() {
        let request = SyncRequest::new(".", "www").with_options(SyncOptions {
            excludes: vec!["[".to_string()],
            ..Default::default()
        });
        assert!(matches!(SyncEngine::new(request), Err(Error::Filter { .. })));

        let request = SyncRequest::new(".", "www").with_options(SyncOptions {
            block_size: 0,
            ..Default::default()
        });
        assert!(matches!(SyncEngine::new(request), Err(Error::Config { .. })));
    }

    #[test]
    fn test_empty_file_list_means_walk() {
        let request = SyncRequest::new(".", "www").with_files(Vec::new());
        assert!(request.files.is_none());
    }

    #[tokio::test]
    async fn test_phases_are_reported_in_order() {
        let local = LocalTree::new();
        local.file("a.txt", b"a", 1_000);
        let remote = MemoryRemote::new();
        let progress = Arc::new(RecordingProgress::default());
        let engine = SyncEngine::new(
            SyncRequest::new(local.path(), "www").with_options(SyncOptions::mirror()),
        )
        .unwrap()
        .with_progress(progress.clone());

        let mut session = MirrorSession::new(remote.connect());
        engine.sync(&mut session).await.unwrap();

        assert_eq!(
            *progress.phases.lock().unwrap(),
            vec![
                SyncPhase::Connecting,
                SyncPhase::Calibrating,
                SyncPhase::Negotiating,
                SyncPhase::IndexingRemote,
                SyncPhase::ScanningLocal,
                SyncPhase::Uploading,
                SyncPhase::DeletingOrphans,
                SyncPhase::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_blocks_reported_only_for_large_files() {
        let local = LocalTree::new();
        local.file("small.txt", &[b's'; 16], 1_000);
        local.file("large.bin", &[b'l'; 100], 1_000);
        let remote = MemoryRemote::new();
        let progress = Arc::new(RecordingProgress::default());
        let engine = SyncEngine::new(
            SyncRequest::new(local.path(), "").with_options(SyncOptions {
                block_size: 32,
                ..Default::default()
            }),
        )
        .unwrap()
        .with_progress(progress.clone());

        let mut session = MirrorSession::new(remote.connect());
        let result = engine.sync(&mut session).await.unwrap();

        assert_eq!(result.stats.files_uploaded, 2);
        let blocks = progress.blocks.lock().unwrap();
        assert!(blocks.iter().all(|(path, _)| path == "large.bin"));
        assert_eq!(
            blocks.iter().map(|(_, n)| *n).collect::<Vec<_>>(),
            vec![32, 32, 32, 4]
        );
        assert_eq!(remote.file_content("large.bin").unwrap().len(), 100);
    }

    #[tokio::test]
    async fn test_missing_local_root_fails_before_remote_activity() {
        let remote = MemoryRemote::new();
        let engine = SyncEngine::new(SyncRequest::new("/nonexistent/ftpmirror/root", "www")).unwrap();

        let mut session = MirrorSession::new(remote.connect());
        let err = engine.sync(&mut session).await.unwrap_err();

        assert!(matches!(err, Error::LocalFile { .. }));
        assert!(remote.commands().is_empty());
    }
}
