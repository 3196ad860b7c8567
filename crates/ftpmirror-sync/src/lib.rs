//! One-way mirroring engine for ftpmirror
//!
//! This crate holds the mirroring logic proper. It is transport agnostic: everything remote
//! goes through [`ftpmirror_types::RemoteTransport`].
//!
//! - **Path filtering**: regular-expression exclude and keep rules
//! - **Local scanning**: a pruned walk of the local tree, grouped and sorted by directory
//! - **Clock calibration**: the remote clock offset, measured with a transient marker file
//! - **Directory navigation**: minimal `CDUP`/`CWD` sequences between consecutive directories
//! - **Orphan cleanup**: a recursive remote index, shrunk as local files are matched
//!
//! # Examples
//!
//! ```rust,no_run
//! use ftpmirror_sync::{MirrorSession, SyncEngine, SyncOptions, SyncRequest};
//! use ftpmirror_types::RemoteTransport;
//!
//! # async fn example<T: RemoteTransport>(transport: T) -> ftpmirror_types::Result<()> {
//! let request = SyncRequest::new("site", "public_html").with_options(SyncOptions::mirror());
//! let engine = SyncEngine::new(request)?;
//! let mut session = MirrorSession::new(transport);
//! let result = engine.sync(&mut session).await?;
//! println!("Uploaded {} files", result.stats.files_uploaded);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod calibrate;
pub mod engine;
pub mod features;
pub mod filter;
pub mod indexer;
pub mod metadata;
pub mod navigator;
pub mod progress;
pub mod scanner;
pub mod session;

pub use calibrate::{calibrate_time_offset, MARKER_NAME};
pub use engine::{SyncEngine, SyncOptions, SyncRequest, SyncResult, BLOCK_SIZE};
pub use features::{negotiate_capabilities, RemoteCapabilities};
pub use filter::{FilterRule, PathFilter, RuleKind};
pub use indexer::RemoteIndexer;
pub use navigator::RemoteNavigator;
pub use progress::{NoProgress, ProgressObserver, SyncPhase};
pub use scanner::{FileTreeEntry, LocalTreeScanner};
pub use session::MirrorSession;
