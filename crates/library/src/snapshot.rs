use appmeta_appinfo::AppId;
use appmeta_resolve::ApplicationMetadata;
use std::collections::BTreeMap;

/// Everything the worker has resolved so far, as of one publication.
///
/// Published whole behind an `Arc`; readers never see a half-updated one.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Increments with every publication.
    pub generation: u64,
    /// BLAKE3 of the cache file the metadata was resolved from.
    pub fingerprint: Option<blake3::Hash>,
    pub cache_version: Option<u32>,
    /// Number of records in the cache.
    pub records: usize,
    apps: BTreeMap<AppId, ApplicationMetadata>,
}
impl Snapshot {
    pub fn get(&self, appid: AppId) -> Option<&ApplicationMetadata> {
        self.apps.get(&appid)
    }

    pub fn contains(&self, appid: AppId) -> bool {
        self.apps.contains_key(&appid)
    }

    pub fn apps(&self) -> impl Iterator<Item = &ApplicationMetadata> {
        self.apps.values()
    }

    pub fn appids(&self) -> impl Iterator<Item = AppId> + '_ {
        self.apps.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    pub(crate) fn insert(&mut self, metadata: ApplicationMetadata) {
        self.apps.insert(metadata.appid, metadata);
    }

    pub(crate) fn clear(&mut self) {
        self.apps.clear();
    }
}
