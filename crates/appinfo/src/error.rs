//! Appinfo Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An appinfo error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for appinfo operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Cache file doesn't exist (yet). Nothing is known about any application.
    #[display("cache file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Cache file exists but couldn't be read.
    #[display("I/O error reading cache file: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// The file header is too short to be a cache file.
    #[display("malformed cache header")]
    MalformedHeader,
    /// The header declares a layout this crate doesn't know; records are read
    /// with the newest known layout.
    #[display("unsupported cache format version: {_0:#010x}")]
    UnsupportedFormatVersion(#[error(not(source))] u32),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The owning client rewrites the file on exit, so both of these can
        // clear up on their own.
        matches!(self, Self::NotFound(_) | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::UnsupportedFormatVersion(0x0756_4429).to_string(),
            "unsupported cache format version: 0x07564429"
        );
        assert_eq!(ErrorKind::MalformedHeader.to_string(), "malformed cache header");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::NotFound(PathBuf::new()).is_retryable());
        assert!(!ErrorKind::MalformedHeader.is_retryable());
        assert!(!ErrorKind::UnsupportedFormatVersion(0).is_retryable());
    }
}
