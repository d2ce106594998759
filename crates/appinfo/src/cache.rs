use crate::error::{ErrorKind, Result};
use crate::header::{FILE_HEADER_SIZE, Header};
use crate::record::{AppId, AppInfoRecord, SENTINEL_APPID};
use appmeta_vdf::Reader;
use exn::ResultExt;
use std::path::Path;
use tracing::instrument;

/// One record together with its section blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    pub record: AppInfoRecord,
    pub blob: &'a [u8],
}

/// The whole appinfo cache file, held in memory.
///
/// The buffer is never modified after loading. A cache that couldn't be read
/// or whose header is malformed is still usable; it simply knows about no
/// applications.
#[derive(Debug, Clone)]
pub struct AppInfoCache {
    buffer: Vec<u8>,
    header: Option<Header>,
    issue: Option<ErrorKind>,
    fingerprint: blake3::Hash,
}
impl Default for AppInfoCache {
    fn default() -> Self {
        Self::from_bytes(Vec::new())
    }
}
impl AppInfoCache {
    /// A cache that knows nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads the cache file at `path`. A missing or unreadable file gives an
    /// empty cache.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Self {
        match Self::try_load(path) {
            Ok(cache) => cache,
            Err(err) => {
                tracing::info!(error = %*err, "Appinfo cache unavailable; nothing is known yet");
                let mut cache = Self::empty();
                cache.issue = Some((*err).clone());
                cache
            },
        }
    }

    /// Like [`load`](Self::load), raising [`ErrorKind::NotFound`] or
    /// [`ErrorKind::Io`] instead of falling back to an empty cache.
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let buffer = std::fs::read(path).or_raise(|| {
            if path.exists() {
                ErrorKind::Io(path.to_path_buf())
            } else {
                ErrorKind::NotFound(path.to_path_buf())
            }
        })?;
        Ok(Self::from_bytes(buffer))
    }

    pub fn from_bytes(buffer: Vec<u8>) -> Self {
        let fingerprint = blake3::hash(&buffer);
        let mut reader = Reader::new(&buffer);
        let (header, issue) = if buffer.is_empty() {
            (None, None)
        } else {
            match Header::read(&mut reader) {
                Ok((header, issue)) => (Some(header), issue),
                Err(issue) => {
                    tracing::warn!(size = buffer.len(), "Appinfo cache header is malformed; ignoring cache");
                    (None, Some(issue))
                },
            }
        };
        Self {
            buffer,
            header,
            issue,
            fingerprint,
        }
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub fn version(&self) -> Option<u32> {
        self.header.map(|h| h.version)
    }

    pub fn universe(&self) -> Option<u32> {
        self.header.map(|h| h.universe)
    }

    /// What degraded while loading, if anything: a missing/unreadable file, a
    /// malformed header, or an unsupported version.
    pub fn issue(&self) -> Option<&ErrorKind> {
        self.issue.as_ref()
    }

    /// BLAKE3 hash of the loaded buffer; changes whenever the file does.
    pub fn fingerprint(&self) -> blake3::Hash {
        self.fingerprint
    }

    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// Iterates over records in file order, stopping at the sentinel.
    pub fn records(&self) -> Records<'_> {
        Records {
            buffer: &self.buffer,
            header: self.header,
            offset: FILE_HEADER_SIZE,
            done: self.header.is_none(),
        }
    }

    /// Finds the record for `appid` by linear scan.
    #[instrument(level = "trace", skip(self))]
    pub fn get(&self, appid: AppId) -> Option<Entry<'_>> {
        if appid == SENTINEL_APPID {
            return None;
        }
        self.records().find(|entry| entry.record.appid == appid)
    }

    /// The section blob of a record previously returned by this cache.
    pub fn blob(&self, record: &AppInfoRecord) -> Option<&[u8]> {
        self.buffer.get(record.blob_range())
    }

    pub fn len(&self) -> usize {
        self.records().count()
    }

    pub fn is_empty(&self) -> bool {
        self.records().next().is_none()
    }
}

/// Iterator over the records of an [`AppInfoCache`].
///
/// Each record's stride is computed from its own header, so a record with a
/// bad size can only truncate the iteration, never shift the fields of the
/// records read before it.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    buffer: &'a [u8],
    header: Option<Header>,
    offset: usize,
    done: bool,
}
impl<'a> Iterator for Records<'a> {
    type Item = Entry<'a>;
    fn next(&mut self) -> Option<Entry<'a>> {
        if self.done {
            return None;
        }
        let layout = self.header?.layout;
        let buffer: &'a [u8] = self.buffer;
        let mut reader = Reader::at(buffer, self.offset);
        let entry = match reader.u32_le() {
            None => {
                tracing::warn!(offset = self.offset, "Appinfo cache ended without a sentinel record");
                None
            },
            Some(SENTINEL_APPID) => None,
            Some(appid) => match AppInfoRecord::read(appid, &mut reader, layout) {
                None => {
                    tracing::warn!(appid, offset = self.offset, "Truncated appinfo record header");
                    None
                },
                Some(record) => match buffer.get(record.blob_range()) {
                    None => {
                        tracing::warn!(appid, size = record.size, "Appinfo record runs past the end of the cache");
                        None
                    },
                    Some(blob) => {
                        self.offset += layout.record_header_size() + record.size as usize;
                        Some(Entry { record, blob })
                    },
                },
            },
        };
        self.done = entry.is_none();
        entry
    }
}
