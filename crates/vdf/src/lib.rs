//! Readers for Valve's KeyValues ("VDF") formats.
//!
//! - [`binary`]: the typed, opcode-based encoding used inside the appinfo
//!   cache. Produces a flat, ordered list of [`Section`]s.
//! - [`text`]: the quoted, brace-delimited encoding used by manifests and
//!   per-user config files. Answers path/key lookups directly.
//!
//! Both readers are built for data this crate doesn't own and which changes
//! without notice: malformed input degrades to partial or empty results and
//! a log line, never a panic or an error.

pub mod binary;
pub mod error;
mod reader;
mod section;
pub mod text;

pub use crate::binary::{Tokenizer, parse};
pub use crate::reader::Reader;
pub use crate::section::{PATH_SEPARATOR, Section, TypedValue};
pub use crate::text::KeyValues;
