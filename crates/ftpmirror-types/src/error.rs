//! Error types and handling for ftpmirror
//!
//! Every fallible operation in the workspace returns [`Error`]. The variants follow the
//! failure taxonomy of a mirror run: negative server replies, malformed replies, broken
//! connections, unreadable local files, clock calibration failures and bad configuration.
//! Only a permanent negative reply to a metadata query is recoverable; the engine treats it
//! as "file absent". Everything else aborts the run.

use std::path::PathBuf;

/// Main error type for ftpmirror operations
#[derive(thiserror::Error, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// A local file or directory could not be read or inspected
    #[error("Local file error for '{path}': {message}")]
    LocalFile {
        /// Path of the offending local entry
        path: PathBuf,
        /// Underlying error message
        message: String,
    },

    /// The server answered a command with a negative reply
    #[error("Server replied {code}: {message}")]
    Reply {
        /// Three digit reply code
        code: u16,
        /// Reply text without the code
        message: String,
    },

    /// The server sent something that could not be understood
    #[error("Protocol error: {message}")]
    Protocol {
        /// Error message describing the malformed exchange
        message: String,
    },

    /// Network error
    #[error("Network error: {message}")]
    Network {
        /// Error message describing the network issue
        message: String,
    },

    /// Clock offset between local and remote could not be established
    #[error("Clock calibration failed: {message}")]
    Calibration {
        /// Error message describing the calibration failure
        message: String,
    },

    /// A filter pattern could not be compiled
    #[error("Invalid filter pattern '{pattern}': {message}")]
    Filter {
        /// The offending pattern as given by the user
        pattern: String,
        /// Compiler message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {seconds} seconds")]
    Timeout {
        /// Number of seconds after which the operation timed out
        seconds: u64,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Local I/O related errors
    Io,
    /// Negative server replies
    Reply,
    /// Malformed protocol exchanges
    Protocol,
    /// Connection level failures
    Network,
    /// Clock calibration failures
    Calibration,
    /// Filter and configuration errors
    Config,
    /// Timeout
    Timeout,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } | Self::LocalFile { .. } => ErrorKind::Io,
            Self::Reply { .. } => ErrorKind::Reply,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Network { .. } => ErrorKind::Network,
            Self::Calibration { .. } => ErrorKind::Calibration,
            Self::Filter { .. } | Self::Config { .. } => ErrorKind::Config,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Reply code carried by this error, if it came from a server reply
    pub fn reply_code(&self) -> Option<u16> {
        match self {
            Self::Reply { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Check whether this is a permanent negative completion reply (5xx).
    ///
    /// Servers answer `MDTM`, `SIZE` and `MLST` for a missing file this way, so the engine
    /// reads it as "not present on the remote".
    pub fn is_permanent_reply(&self) -> bool {
        matches!(self.reply_code(), Some(500..=599))
    }

    /// Create a new reply error
    pub fn reply<S: Into<String>>(code: u16, message: S) -> Self {
        Self::Reply {
            code,
            message: message.into(),
        }
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new calibration error
    pub fn calibration<S: Into<String>>(message: S) -> Self {
        Self::Calibration {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new local file error
    pub fn local_file<P: Into<PathBuf>>(path: P, error: &std::io::Error) -> Self {
        Self::LocalFile {
            path: path.into(),
            message: error.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}
