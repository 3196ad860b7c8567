//! Core type system and error handling for ftpmirror
//!
//! This crate provides the foundational pieces shared by every ftpmirror crate:
//!
//! - **Error handling**: one error enum covering server replies, network, local I/O,
//!   calibration and configuration failures
//! - **Core types**: remote file metadata, the clock offset and run statistics
//! - **Transport contract**: the async [`RemoteTransport`] trait the engine drives
//!
//! # Features
//!
//! - `serde`: Enable serialization support for the data types
//!
//! # Examples
//!
//! ```rust
//! use ftpmirror_types::{RemoteFileMetadata, TimeOffset};
//!
//! let offset = TimeOffset::between(1_700_000_060, 1_700_000_000);
//! let remote = RemoteFileMetadata::from_raw(1_600_000_000, 10, offset);
//! assert!(!remote.needs_upload(1_600_000_000, 10));
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod result;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
pub use result::Result;
pub use traits::{fill_block, BlockCallback, DirectoryChange, RemoteTransport};
pub use types::*;
