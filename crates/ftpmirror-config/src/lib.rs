//! Layered configuration for ftpmirror
//!
//! Settings are merged from, in increasing priority:
//!
//! - **Defaults**: the values of [`MirrorConfig::default`]
//! - **A configuration file**: YAML, TOML or JSON, either given explicitly or found in one of
//!   the default locations (see [`ConfigLoader`])
//! - **Environment variables**: `FTPMIRROR__SECTION__KEY`, e.g. `FTPMIRROR__CONNECTION__PORT`
//!
//! Command line flags are applied on top by the binary.
//!
//! # Examples
//!
//! ```rust
//! use ftpmirror_config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .add_defaults()
//!     .add_source_file("ftpmirror.toml")
//!     .add_env_prefix("FTPMIRROR")
//!     .build()
//!     .expect("Failed to load configuration");
//!
//! println!("Port: {}", config.connection.port);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod builder;
pub mod error;
pub mod loader;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

/// Upload block size used when none is configured
pub const DEFAULT_BLOCK_SIZE: usize = 32760;

/// Main configuration structure for ftpmirror
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Server connection settings
    pub connection: ConnectionConfig,
    /// Mirror behavior
    pub sync: SyncConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// FTP control port
    pub port: u16,
    /// Seconds to wait for a connection to be established
    pub connect_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port: 21,
            connect_timeout_secs: 30,
        }
    }
}

/// Mirror behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Local directory to mirror
    pub local_root: PathBuf,
    /// Delete remote files without a local counterpart
    pub clean: bool,
    /// Patterns of paths left out of the mirror
    pub excludes: Vec<String>,
    /// Patterns of remote paths never deleted
    pub keeps: Vec<String>,
    /// Upload block size in bytes
    pub block_size: usize,
    /// Name of the clock calibration marker file
    pub marker_name: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            local_root: PathBuf::from("."),
            clean: false,
            excludes: Vec::new(),
            keeps: Vec::new(),
            block_size: DEFAULT_BLOCK_SIZE,
            marker_name: ".timestamp".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
