//! KeyValues Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! The parsers themselves never return these for malformed input; they log
//! the kind and hand back whatever could be salvaged. The kinds surface
//! through [`Report`](crate::binary::Report) and the fallible helpers
//! ([`validate`](crate::text::validate), [`try_read_file`](crate::text::try_read_file)).

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A KeyValues error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for KeyValues operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Token stream or brace structure is broken. Don't retry with the same input.
    #[display("corrupt section data: {_0}")]
    CorruptSection(#[error(not(source))] String),
    /// The requested file does not exist.
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The file exists but could not be read.
    #[display("I/O error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
