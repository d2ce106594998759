//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An explicitly requested config file doesn't exist.
    #[display("config file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The file extension isn't one of `toml`, `yaml`, `yml` or `json`.
    #[display("unsupported config format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// A setting couldn't be read or has the wrong type; fix the source.
    #[display("invalid configuration")]
    Invalid,
    /// A path setting must be absolute.
    #[display("{field} must be an absolute path: {}", path.display())]
    RelativePath { field: &'static str, path: PathBuf },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::RelativePath {
                field: "steam_root",
                path: PathBuf::from("steam"),
            }
            .to_string(),
            "steam_root must be an absolute path: steam"
        );
        assert_eq!(
            ErrorKind::UnsupportedFormat(PathBuf::from("config.ini")).to_string(),
            "unsupported config format: config.ini"
        );
    }
}
