use std::path::PathBuf;

use super::Platforms;

/// Where an application keeps files that are synced to the cloud.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CloudSaveRecord {
    /// Root token, e.g. `gameinstall` or `WinMyDocuments`.
    pub root: String,
    /// Directory below the root, possibly containing `{...}` placeholders.
    pub path: String,
    /// File name pattern, e.g. `*.sav`.
    pub pattern: String,
    pub recursive: bool,
    pub platforms: Platforms,
    /// `root` and `path` resolved on this machine, when possible.
    pub directory: Option<PathBuf>,
}
