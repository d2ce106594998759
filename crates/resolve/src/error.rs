//! Resolution Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Resolution itself never fails; only locating a client install can.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A resolution error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for resolution operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No client install in any of the usual locations; configure one explicitly.
    #[display("no Steam installation found")]
    SteamNotFound,
    /// A configured install root isn't a directory.
    #[display("not a Steam installation: {}", _0.display())]
    InvalidRoot(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
