//! File header and per-record layout selection.

use crate::error::ErrorKind;
use appmeta_vdf::Reader;
use std::sync::atomic::{AtomicBool, Ordering};

/// Size of the file header: version and universe.
pub const FILE_HEADER_SIZE: usize = 8;
/// Version byte of the layout with a single checksum per record.
pub const VERSION_LEGACY: u8 = 0x27;
/// Version byte of the layout that adds a checksum of the binary section data.
pub const VERSION_CURRENT: u8 = 0x28;

static UNSUPPORTED_REPORTED: AtomicBool = AtomicBool::new(false);

/// Fixed record header layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    /// `appid, size, state, last_update, access_token, sha1, change_num`
    Legacy,
    /// [`Legacy`](Self::Legacy) followed by a second SHA-1.
    Current,
}
impl Layout {
    /// Layout for a header version; unknown versions get the newest layout.
    pub fn from_version(version: u32) -> (Self, Option<ErrorKind>) {
        match version.to_le_bytes()[0] {
            VERSION_LEGACY => (Self::Legacy, None),
            VERSION_CURRENT => (Self::Current, None),
            _ => (Self::Current, Some(ErrorKind::UnsupportedFormatVersion(version))),
        }
    }

    /// Bytes from the start of a record to the start of its section blob.
    pub const fn record_header_size(self) -> usize {
        let legacy = 4 + 4 + 4 + 4 + 8 + 20 + 4;
        match self {
            Self::Legacy => legacy,
            Self::Current => legacy + 20,
        }
    }
}

/// The cache file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    pub version: u32,
    pub universe: u32,
    pub layout: Layout,
}
impl Header {
    /// Reads the header. An unsupported version is not a failure: it is
    /// logged once per process and returned alongside the best-guess header.
    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<(Self, Option<ErrorKind>), ErrorKind> {
        let (Some(version), Some(universe)) = (reader.u32_le(), reader.u32_le()) else {
            return Err(ErrorKind::MalformedHeader);
        };
        let (layout, issue) = Layout::from_version(version);
        if issue.is_some() && !UNSUPPORTED_REPORTED.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                version = format_args!("{version:#010x}"),
                "Unsupported appinfo cache version; parsing with the newest known layout"
            );
        }
        Ok((Self { version, universe, layout }, issue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0x0756_4427, Layout::Legacy, false)]
    #[case(0x0756_4428, Layout::Current, false)]
    #[case(0x0756_4429, Layout::Current, true)]
    #[case(0x0000_0000, Layout::Current, true)]
    fn layout_from_version(#[case] version: u32, #[case] layout: Layout, #[case] unsupported: bool) {
        let (actual, issue) = Layout::from_version(version);
        assert_eq!(actual, layout);
        assert_eq!(issue.is_some(), unsupported);
    }

    #[test]
    fn record_header_sizes() {
        assert_eq!(Layout::Legacy.record_header_size(), 48);
        assert_eq!(Layout::Current.record_header_size(), 68);
    }

    #[test]
    fn short_header_is_malformed() {
        let mut reader = Reader::new(&[0x28, 0x44, 0x56, 0x07, 1]);
        assert_eq!(Header::read(&mut reader), Err(ErrorKind::MalformedHeader));
    }
}
