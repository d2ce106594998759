//! Turns an application's sections into [`ApplicationMetadata`].

mod branch;
mod cloud;
mod launch;

pub use self::cloud::SaveRoots;

use crate::models::{AppType, ApplicationMetadata, CloudSaveRecord, CpuArch};
use crate::steam::SteamInstall;
use appmeta_appinfo::{AppId, AppInfoCache, AppInfoRecord, Entry};
use appmeta_vdf::{Section, Tokenizer, TypedValue};
use std::collections::BTreeMap;
use std::thread::{self, ThreadId};
use tracing::instrument;

/// Maps the store's assorted architecture spellings onto [`CpuArch`].
///
/// The value may be an integer or a numeric string. Missing, empty and `0`
/// mean unspecified; any number other than 32 or 64, or a non-number, means
/// any architecture.
pub fn normalize_cpu_arch(value: Option<&TypedValue>) -> CpuArch {
    let Some(value) = value else {
        return CpuArch::Unspecified;
    };
    if value.as_str().is_some_and(|s| s.trim().is_empty()) {
        return CpuArch::Unspecified;
    }
    value.to_integer().map_or(CpuArch::Any, CpuArch::from_bits)
}

/// Settings that change what resolution produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Keep launch options that can't run on Windows (flagged invalid)
    /// instead of dropping them.
    pub retain_unsupported: bool,
    /// 32-bit account id used to fill in cloud save placeholders.
    pub account_id: Option<u32>,
    pub roots: SaveRoots,
}
impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            retain_unsupported: false,
            account_id: None,
            roots: SaveRoots::from_system(),
        }
    }
}

/// Resolves sections into metadata.
///
/// Keeps a [`Tokenizer`] around so its buffers are reused between
/// applications, and so must stay on the thread that created it.
#[derive(Debug)]
pub struct Resolver {
    owner: ThreadId,
    tokenizer: Tokenizer,
    options: ResolveOptions,
    steam: Option<SteamInstall>,
}
impl Default for Resolver {
    fn default() -> Self {
        Self::new(ResolveOptions::default())
    }
}
impl Resolver {
    pub fn new(options: ResolveOptions) -> Self {
        Self {
            owner: thread::current().id(),
            tokenizer: Tokenizer::new(),
            options,
            steam: None,
        }
    }

    /// Look up install directories through `steam`.
    pub fn with_steam(mut self, steam: SteamInstall) -> Self {
        self.steam = Some(steam);
        self
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    pub fn steam(&self) -> Option<&SteamInstall> {
        self.steam.as_ref()
    }

    fn assert_owner(&self) {
        assert_eq!(thread::current().id(), self.owner, "resolver used from a thread other than its owner");
    }

    /// Tokenizes one section blob with the resolver's tokenizer.
    pub fn tokenize(&mut self, blob: &[u8]) -> Vec<Section> {
        self.assert_owner();
        self.tokenizer.tokenize(blob)
    }

    /// Resolves the application in `entry` into fresh metadata.
    pub fn resolve_entry(&mut self, entry: Entry<'_>) -> ApplicationMetadata {
        let sections = self.tokenize(entry.blob);
        let mut metadata = ApplicationMetadata::new(entry.record.appid);
        self.resolve(&sections, &entry.record, &mut metadata);
        metadata
    }

    /// Looks `appid` up in `cache` and resolves it.
    pub fn resolve_app(&mut self, cache: &AppInfoCache, appid: AppId) -> Option<ApplicationMetadata> {
        let entry = cache.get(appid)?;
        Some(self.resolve_entry(entry))
    }

    /// Fills `metadata` from `sections` in a single pass.
    ///
    /// Runs at most once per metadata value; later calls return immediately.
    /// Never fails: whatever is missing or malformed keeps its default.
    #[instrument(level = "debug", skip_all, fields(appid = record.appid))]
    pub fn resolve(&self, sections: &[Section], record: &AppInfoRecord, metadata: &mut ApplicationMetadata) {
        self.assert_owner();
        if metadata.is_processed() {
            tracing::trace!("Already resolved");
            return;
        }
        if metadata.appid != record.appid {
            tracing::warn!(expected = metadata.appid, "Record belongs to a different application; not resolving");
            return;
        }

        metadata.change_number = record.change_num;
        metadata.last_update = (record.last_update > 0).then_some(i64::from(record.last_update));
        metadata.install_dir = self.steam.as_ref().and_then(|steam| steam.install_dir(record.appid));

        let mut launches = BTreeMap::new();
        let mut cloud_saves: BTreeMap<u32, CloudSaveRecord> = BTreeMap::new();

        for section in sections {
            // The first component is the blob's root, named after the appid.
            let components: Vec<String> = section.components().skip(1).map(str::to_ascii_lowercase).collect();
            let components: Vec<&str> = components.iter().map(String::as_str).collect();
            match components.as_slice() {
                ["common"] => apply_common(metadata, section),
                ["config", "launch", index] => {
                    if let Some(index) = parse_index(index) {
                        let config = launches.entry(index).or_insert_with(|| launch::blank(index));
                        launch::apply_launch(config, section);
                    }
                },
                ["config", "launch", index, "config"] => {
                    if let Some(index) = parse_index(index) {
                        let config = launches.entry(index).or_insert_with(|| launch::blank(index));
                        launch::apply_restrictions(config, section);
                    }
                },
                ["ufs", "savefiles", index] => {
                    if let Some(index) = parse_index(index) {
                        cloud::apply_rule(cloud_saves.entry(index).or_insert_with(blank_rule), section);
                    }
                },
                ["ufs", "savefiles", index, "platforms"] => {
                    if let Some(index) = parse_index(index) {
                        cloud::apply_platforms(cloud_saves.entry(index).or_insert_with(blank_rule), section);
                    }
                },
                ["depots", "branches", _] => {
                    if let Some(branch) = branch::read_branch(record.appid, section) {
                        metadata.branches.insert(branch.name.clone(), branch);
                    } else {
                        tracing::debug!(branch = %section.name(), "Discarding branch without known fields");
                    }
                },
                _ => {},
            }
        }

        metadata.launch_configs = launch::finish(launches, self.options.retain_unsupported);
        metadata.cloud_saves = cloud_saves
            .into_iter()
            .filter(|(index, rule)| {
                let supported = cloud::is_supported(rule);
                if !supported {
                    tracing::debug!(index, platforms = %rule.platforms, "Skipping cloud save rule for other platforms");
                }
                supported
            })
            .map(|(index, mut rule)| {
                rule.directory = cloud::resolve_directory(
                    &rule,
                    &self.options.roots,
                    metadata.install_dir.as_deref(),
                    self.options.account_id,
                );
                (index, rule)
            })
            .collect();
        metadata.mark_processed();

        tracing::debug!(
            launch_configs = metadata.launch_configs.len(),
            branches = metadata.branches.len(),
            cloud_saves = metadata.cloud_saves.len(),
            "Resolved application"
        );
    }
}

fn apply_common(metadata: &mut ApplicationMetadata, section: &Section) {
    metadata.cpu_arch = normalize_cpu_arch(section.get("osarch"));
    if let Some(app_type) = section.get("type") {
        metadata.app_type = AppType::from(app_type.to_string().as_str());
    }
    if let Some(name) = section.get("name") {
        metadata.name = name.to_string();
    }
}

fn parse_index(component: &str) -> Option<u32> {
    let index = component.parse().ok();
    if index.is_none() {
        tracing::trace!(component, "Ignoring non-numeric index");
    }
    index
}

/// Rules without a `platforms` list apply everywhere.
fn blank_rule() -> CloudSaveRecord {
    CloudSaveRecord {
        platforms: crate::models::Platforms::ALL,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LaunchType, Platforms};
    use appmeta_vdf::binary::Writer;
    use rstest::rstest;
    use std::path::PathBuf;

    /// An appinfo file in the newer layout holding one application.
    fn cache_with(appid: AppId, blob: &[u8]) -> AppInfoCache {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0x0756_4428u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&appid.to_le_bytes());
        bytes.extend_from_slice(&u32::try_from(blob.len()).unwrap().to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&1_700_000_000i32.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 20]);
        bytes.extend_from_slice(&77u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 20]);
        bytes.extend_from_slice(blob);
        bytes.extend_from_slice(&0u32.to_le_bytes());
        AppInfoCache::from_bytes(bytes)
    }

    fn options() -> ResolveOptions {
        ResolveOptions {
            retain_unsupported: false,
            account_id: Some(22202),
            roots: SaveRoots {
                documents: Some(PathBuf::from("/docs")),
                local_data: Some(PathBuf::from("/local")),
                roaming_data: Some(PathBuf::from("/roaming")),
                home: Some(PathBuf::from("/home")),
            },
        }
    }

    fn game_blob() -> Vec<u8> {
        Writer::new()
            .begin("440")
            .begin("common")
            .string("name", "Team Fortress 2")
            .string("type", "Game")
            .string("osarch", "64")
            .end()
            .begin("config")
            .begin("launch")
            .begin("0")
            .string("executable", "hl2.exe")
            .string("arguments", "-game tf")
            .end()
            .begin("3")
            .string("executable", "tf_win64.exe")
            .string("type", "default")
            .end()
            .begin("5")
            .string("executable", "hl2_linux")
            .begin("config")
            .string("oslist", "linux")
            .end()
            .end()
            .end()
            .end()
            .begin("ufs")
            .begin("savefiles")
            .begin("0")
            .string("root", "WinAppDataRoaming")
            .string("path", "TF2/{64BitSteamID}")
            .string("pattern", "*.cfg")
            .int32("recursive", 1)
            .end()
            .begin("1")
            .string("root", "MacAppSupport")
            .string("path", "TF2")
            .begin("platforms")
            .string("1", "MacOS")
            .end()
            .end()
            .end()
            .end()
            .begin("depots")
            .begin("branches")
            .begin("public")
            .string("buildid", "100")
            .int32("timeupdated", 1_700_000_000)
            .end()
            .begin("prerelease")
            .string("buildid", "101")
            .string("pwdrequired", "1")
            .end()
            .begin("bogus")
            .string("unknown", "x")
            .end()
            .end()
            .end()
            .end()
            .finish()
    }

    #[test]
    fn resolves_application() {
        let cache = cache_with(440, &game_blob());
        let mut resolver = Resolver::new(options());
        let metadata = resolver.resolve_app(&cache, 440).expect("appid 440");

        assert!(metadata.is_processed());
        assert_eq!(metadata.name, "Team Fortress 2");
        assert_eq!(metadata.app_type, AppType::Game);
        assert_eq!(metadata.cpu_arch, CpuArch::X64);
        assert_eq!(metadata.change_number, 77);
        assert_eq!(metadata.last_update, Some(1_700_000_000));

        assert_eq!(metadata.launch_configs.len(), 2);
        let primary = metadata.primary_launch().expect("primary");
        assert_eq!(primary.executable, "tf_win64.exe");
        assert_eq!(primary.launch_type, LaunchType::Default);
        assert_eq!(metadata.launch_configs[&1].executable, "hl2.exe");
        assert_eq!(metadata.launch_configs[&1].arguments, "-game tf");

        assert_eq!(metadata.branches.len(), 2);
        assert_eq!(metadata.branch("public").and_then(|b| b.build_id), Some(100));
        assert!(metadata.branch("prerelease").is_some_and(|b| b.password_required));

        assert_eq!(metadata.cloud_saves.len(), 1);
        let save = &metadata.cloud_saves[&0];
        assert!(save.recursive);
        assert_eq!(save.pattern, "*.cfg");
        assert_eq!(save.directory, Some(PathBuf::from("/roaming/TF2/76561197960287930")));
    }

    #[test]
    fn dotted_branch_names_are_kept() {
        let blob = Writer::new()
            .begin("440")
            .begin("depots")
            .begin("branches")
            .begin("public")
            .string("buildid", "100")
            .end()
            .begin("1.2.3")
            .string("buildid", "90")
            .string("description", "Legacy build")
            .end()
            .end()
            .end()
            .end()
            .finish();
        let cache = cache_with(440, &blob);
        let metadata = Resolver::new(options()).resolve_app(&cache, 440).expect("appid 440");
        assert_eq!(metadata.branches.len(), 2);
        let legacy = metadata.branch("1.2.3").expect("dotted branch");
        assert_eq!(legacy.build_id, Some(90));
        assert_eq!(legacy.description, "Legacy build");
    }

    #[test]
    fn resolution_is_idempotent() {
        let cache = cache_with(440, &game_blob());
        let entry = cache.get(440).expect("appid 440");
        let mut resolver = Resolver::new(options());
        let sections = resolver.tokenize(entry.blob);

        let mut metadata = ApplicationMetadata::new(440);
        resolver.resolve(&sections, &entry.record, &mut metadata);
        let first = metadata.clone();
        resolver.resolve(&sections, &entry.record, &mut metadata);
        assert_eq!(metadata, first);
    }

    #[test]
    fn mismatched_record_is_ignored() {
        let cache = cache_with(440, &game_blob());
        let entry = cache.get(440).expect("appid 440");
        let mut resolver = Resolver::new(options());
        let sections = resolver.tokenize(entry.blob);

        let mut metadata = ApplicationMetadata::new(570);
        resolver.resolve(&sections, &entry.record, &mut metadata);
        assert!(!metadata.is_processed());
        assert!(metadata.launch_configs.is_empty());
    }

    #[test]
    fn retains_unsupported_launches_when_asked() {
        let cache = cache_with(440, &game_blob());
        let mut resolver = Resolver::new(ResolveOptions {
            retain_unsupported: true,
            ..options()
        });
        let metadata = resolver.resolve_app(&cache, 440).expect("appid 440");
        assert_eq!(metadata.launch_configs.len(), 3);
        let linux = metadata.launch_configs.values().find(|c| c.source_id == 5).expect("linux option");
        assert!(!linux.valid);
        assert_eq!(linux.platforms, Platforms::LINUX);
    }

    #[test]
    fn missing_sections_keep_defaults() {
        let blob = Writer::new().begin("7").begin("extended").string("developer", "Someone").end().end().finish();
        let cache = cache_with(7, &blob);
        let metadata = Resolver::new(options()).resolve_app(&cache, 7).expect("appid 7");
        assert!(metadata.is_processed());
        assert_eq!(metadata.app_type, AppType::Unknown);
        assert_eq!(metadata.cpu_arch, CpuArch::Unspecified);
        assert!(metadata.launch_configs.is_empty());
        assert!(metadata.primary_launch().is_none());
    }

    #[test]
    fn unknown_appid() {
        let cache = cache_with(440, &game_blob());
        assert!(Resolver::new(options()).resolve_app(&cache, 441).is_none());
    }

    #[rstest]
    #[case(Some(TypedValue::Int32(64)), CpuArch::X64)]
    #[case(Some(TypedValue::from("64")), CpuArch::X64)]
    #[case(Some(TypedValue::Int64(32)), CpuArch::X86)]
    #[case(Some(TypedValue::from("0")), CpuArch::Unspecified)]
    #[case(Some(TypedValue::from("")), CpuArch::Unspecified)]
    #[case(None, CpuArch::Unspecified)]
    #[case(Some(TypedValue::Int32(16)), CpuArch::Any)]
    #[case(Some(TypedValue::from("arm64")), CpuArch::Any)]
    fn cpu_arch_normalization(#[case] value: Option<TypedValue>, #[case] expected: CpuArch) {
        assert_eq!(normalize_cpu_arch(value.as_ref()), expected);
    }

    #[test]
    fn resolver_is_bound_to_its_thread() {
        let resolver = Resolver::new(options());
        let result = std::thread::spawn(move || {
            let record_cache = cache_with(440, &game_blob());
            let entry = record_cache.get(440).expect("appid 440");
            let mut metadata = ApplicationMetadata::new(440);
            resolver.resolve(&[], &entry.record, &mut metadata);
        })
        .join();
        assert!(result.is_err());
    }
}
