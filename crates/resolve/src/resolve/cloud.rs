use crate::models::{CloudSaveRecord, Platforms};
use appmeta_vdf::Section;
use directories::{BaseDirs, UserDirs};
use std::path::{Path, PathBuf};

/// Offset between a 32-bit account id and its 64-bit individual SteamID.
const STEAMID64_BASE: u64 = 76_561_197_960_265_728;

/// Directories that cloud save root tokens refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveRoots {
    pub documents: Option<PathBuf>,
    pub local_data: Option<PathBuf>,
    pub roaming_data: Option<PathBuf>,
    pub home: Option<PathBuf>,
}
impl SaveRoots {
    /// The current user's directories, as far as the platform knows them.
    pub fn from_system() -> Self {
        let base = BaseDirs::new();
        let user = UserDirs::new();
        Self {
            documents: user.as_ref().and_then(|dirs| dirs.document_dir()).map(Path::to_path_buf),
            local_data: base.as_ref().map(|dirs| dirs.data_local_dir().to_path_buf()),
            roaming_data: base.as_ref().map(|dirs| dirs.data_dir().to_path_buf()),
            home: base.as_ref().map(|dirs| dirs.home_dir().to_path_buf()),
        }
    }

    fn root(&self, token: &str, install_dir: Option<&Path>) -> Option<PathBuf> {
        match token.to_ascii_lowercase().as_str() {
            "gameinstall" => install_dir.map(Path::to_path_buf),
            "winmydocuments" => self.documents.clone(),
            "winappdatalocal" => self.local_data.clone(),
            "winappdataroaming" => self.roaming_data.clone(),
            "winsavedgames" => self.home.as_ref().map(|home| home.join("Saved Games")),
            "winappdatalocallow" => self
                .local_data
                .as_ref()
                .and_then(|local| local.parent())
                .map(|parent| parent.join("LocalLow")),
            _ => None,
        }
    }
}

/// `ufs.savefiles.<N>`
pub(super) fn apply_rule(record: &mut CloudSaveRecord, section: &Section) {
    for (key, value) in section.pairs() {
        match key.to_ascii_lowercase().as_str() {
            "root" => record.root = value.to_string(),
            "path" => record.path = value.to_string(),
            "pattern" => record.pattern = value.to_string(),
            "recursive" => record.recursive = value.to_integer().is_some_and(|flag| flag != 0),
            _ => tracing::trace!(key = %key, "Ignoring cloud save key"),
        }
    }
}

/// `ufs.savefiles.<N>.platforms`, a list of platform names keyed by index.
pub(super) fn apply_platforms(record: &mut CloudSaveRecord, section: &Section) {
    record.platforms = section
        .pairs()
        .iter()
        .fold(Platforms::NONE, |acc, (_, value)| acc | Platforms::from_name(&value.to_string()));
}

/// Substitutes account placeholders and joins the path onto its root.
///
/// Returns `None` for an unknown root, or when a placeholder is left over.
pub(super) fn resolve_directory(
    record: &CloudSaveRecord,
    roots: &SaveRoots,
    install_dir: Option<&Path>,
    account_id: Option<u32>,
) -> Option<PathBuf> {
    let root = roots.root(&record.root, install_dir)?;
    let mut path = record.path.clone();
    if let Some(account_id) = account_id {
        path = path
            .replace("{64BitSteamID}", &(STEAMID64_BASE + u64::from(account_id)).to_string())
            .replace("{Steam3AccountID}", &account_id.to_string());
    }
    if path.contains('{') {
        tracing::debug!(path = %record.path, "Cloud save path has unresolved placeholders");
        return None;
    }
    let relative = path.replace('\\', "/");
    let relative = relative.trim_matches('/');
    Some(if relative.is_empty() { root } else { root.join(relative) })
}

/// Rules that can't apply on Windows are skipped.
pub(super) fn is_supported(record: &CloudSaveRecord) -> bool {
    record.platforms.contains(Platforms::WINDOWS)
}
