//! Shared test utilities for ftpmirror
//!
//! - [`MemoryRemote`] / [`MemoryTransport`]: an in-memory FTP server model implementing
//!   [`ftpmirror_types::RemoteTransport`], with a command log and failure injection
//! - [`LocalTree`]: temporary local trees with pinned modification times

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory_remote;
pub mod test_utils;

pub use memory_remote::{MemoryRemote, MemoryTransport};
pub use test_utils::LocalTree;
