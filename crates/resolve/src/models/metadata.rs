use super::{AppType, BranchRecord, CloudSaveRecord, CpuArch, LaunchConfig};
use appmeta_appinfo::AppId;
use std::collections::BTreeMap;
use std::path::PathBuf;
use time::UtcDateTime;

/// Everything resolved about one application.
///
/// A plain value: clone it freely and hand it to readers. It is only written
/// by the resolver, once; see [`is_processed`](Self::is_processed).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ApplicationMetadata {
    pub appid: AppId,
    /// Display name (`common.name`)
    pub name: String,
    pub app_type: AppType,
    pub cpu_arch: CpuArch,
    /// Change number of the appinfo record this was resolved from.
    pub change_number: u32,
    /// Unix timestamp of the appinfo record this was resolved from.
    pub last_update: Option<i64>,
    /// Install location, when the application's manifest was found.
    pub install_dir: Option<PathBuf>,
    /// Keyed by dense display id; key 0 is the primary option.
    pub launch_configs: BTreeMap<u32, LaunchConfig>,
    pub branches: BTreeMap<String, BranchRecord>,
    /// Keyed by the store's rule index.
    pub cloud_saves: BTreeMap<u32, CloudSaveRecord>,
    processed: bool,
}
impl ApplicationMetadata {
    pub fn new(appid: AppId) -> Self {
        Self { appid, ..Default::default() }
    }

    /// `true` once resolution has run; resolving again is a no-op.
    pub fn is_processed(&self) -> bool {
        self.processed
    }

    pub(crate) fn mark_processed(&mut self) {
        self.processed = true;
    }

    pub fn updated_at(&self) -> Option<UtcDateTime> {
        self.last_update.and_then(|ts| UtcDateTime::from_unix_timestamp(ts).ok())
    }

    /// The option to start when the user just asks to play.
    pub fn primary_launch(&self) -> Option<&LaunchConfig> {
        self.launch_configs.get(&0)
    }

    /// Launch options usable with `branch` installed, in display order.
    pub fn launch_configs_for<'a>(&'a self, branch: &'a str) -> impl Iterator<Item = &'a LaunchConfig> + 'a {
        self.launch_configs.values().filter(move |config| config.is_available_on(branch))
    }

    pub fn branch(&self, name: &str) -> Option<&BranchRecord> {
        self.branches.get(name)
    }
}
