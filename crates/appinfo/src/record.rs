use crate::header::Layout;
use appmeta_vdf::Reader;
use std::ops::Range;
use time::UtcDateTime;

/// Numeric storefront application identifier.
pub type AppId = u32;

/// Marks the end of the record list.
pub const SENTINEL_APPID: AppId = 0;

/// The fixed header of one application's record.
///
/// Records are plain values describing where the section blob lives in the
/// cache buffer; the blob itself is borrowed from the
/// [`AppInfoCache`](crate::AppInfoCache) on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppInfoRecord {
    pub appid: AppId,
    /// Length of the section blob following the fixed header.
    pub size: u32,
    pub state: u32,
    /// Unix timestamp of the last change to this record.
    pub last_update: i32,
    pub access_token: u64,
    /// SHA-1 of the text representation of the record's data.
    pub sha1: [u8; 20],
    pub change_num: u32,
    /// SHA-1 of the binary section data; only in the newer layout.
    pub binary_sha1: Option<[u8; 20]>,
    offset: usize,
}
impl AppInfoRecord {
    /// Reads the fixed fields that follow `appid` at the reader's position.
    pub(crate) fn read(appid: AppId, reader: &mut Reader<'_>, layout: Layout) -> Option<Self> {
        let size = reader.u32_le()?;
        let state = reader.u32_le()?;
        let last_update = reader.i32_le()?;
        let access_token = reader.u64_le()?;
        let sha1 = reader.array()?;
        let change_num = reader.u32_le()?;
        let binary_sha1 = match layout {
            Layout::Legacy => None,
            Layout::Current => Some(reader.array()?),
        };
        Some(Self {
            appid,
            size,
            state,
            last_update,
            access_token,
            sha1,
            change_num,
            binary_sha1,
            offset: reader.position(),
        })
    }

    /// Location of the section blob within the cache buffer.
    pub fn blob_range(&self) -> Range<usize> {
        self.offset..self.offset.saturating_add(self.size as usize)
    }

    pub fn last_updated(&self) -> Option<UtcDateTime> {
        UtcDateTime::from_unix_timestamp(i64::from(self.last_update)).ok()
    }

    /// Lowercase hex of [`sha1`](Self::sha1).
    pub fn sha1_hex(&self) -> String {
        self.sha1.iter().map(|b| format!("{b:02x}")).collect()
    }
}
