//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Neither an appinfo path nor a Steam install to find one in.
    #[display("no appinfo cache configured and no Steam installation found")]
    NoCache,
    /// The configured Steam install can't be used.
    #[display("invalid Steam installation")]
    Steam,
    /// The worker thread couldn't be started.
    #[display("failed to start library worker")]
    Spawn,
    /// The worker has stopped; start a new library.
    #[display("library worker is no longer running")]
    WorkerGone,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Spawn)
    }
}
