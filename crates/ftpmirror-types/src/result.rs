//! Result type alias for ftpmirror operations

use crate::Error;

/// Result type alias for ftpmirror operations
pub type Result<T> = std::result::Result<T, Error>;
