//! Locations inside a Steam client install.

use crate::error::{ErrorKind, Result};
use appmeta_appinfo::AppId;
use appmeta_vdf::KeyValues;
use directories::BaseDirs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// An application's install manifest (`appmanifest_<appid>.acf`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppManifest {
    pub appid: AppId,
    /// Library folder the manifest was found in.
    pub library: PathBuf,
    pub name: String,
    /// Directory name below `steamapps/common`.
    pub installdir: String,
    pub build_id: Option<u64>,
}
impl AppManifest {
    pub fn install_path(&self) -> Option<PathBuf> {
        (!self.installdir.is_empty()).then(|| self.library.join("steamapps").join("common").join(&self.installdir))
    }
}

/// A client install rooted at one directory.
///
/// The library folder list is read once, on first use, and kept for the
/// life of the value.
#[derive(Debug, Clone)]
pub struct SteamInstall {
    root: PathBuf,
    libraries: OnceLock<Vec<PathBuf>>,
}
impl PartialEq for SteamInstall {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}
impl Eq for SteamInstall {}
impl SteamInstall {
    /// Wraps `root` without checking it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            libraries: OnceLock::new(),
        }
    }

    /// Wraps `root`, which must be an existing directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            exn::bail!(ErrorKind::InvalidRoot(root));
        }
        Ok(Self::new(root))
    }

    /// Looks for an install in the usual per-platform locations.
    pub fn detect() -> Result<Self> {
        let mut candidates = Vec::new();
        if let Some(base) = BaseDirs::new() {
            let home = base.home_dir();
            candidates.push(home.join(".steam").join("steam"));
            candidates.push(home.join(".local").join("share").join("Steam"));
            candidates.push(home.join("Library").join("Application Support").join("Steam"));
        }
        candidates.push(PathBuf::from(r"C:\Program Files (x86)\Steam"));
        candidates.push(PathBuf::from(r"C:\Program Files\Steam"));

        let root = candidates.into_iter().find(|candidate| candidate.join("steamapps").is_dir());
        match root {
            Some(root) => {
                tracing::debug!(root = %root.display(), "Detected Steam installation");
                Ok(Self::new(root))
            },
            None => exn::bail!(ErrorKind::SteamNotFound),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn appinfo_path(&self) -> PathBuf {
        self.root.join("appcache").join("appinfo.vdf")
    }

    /// The root followed by every additional library, without duplicates.
    pub fn library_folders(&self) -> &[PathBuf] {
        self.libraries.get_or_init(|| self.read_library_folders())
    }

    /// Understands both the current `"<N>" { "path" "..." }` layout and the
    /// older `"<N>" "..."` one.
    fn read_library_folders(&self) -> Vec<PathBuf> {
        let folders = KeyValues::read(self.root.join("steamapps").join("libraryfolders.vdf"));
        let mut libraries = vec![self.root.clone()];
        let mut push = |path: &str| {
            let path = PathBuf::from(path);
            if !path.as_os_str().is_empty() && !libraries.contains(&path) {
                libraries.push(path);
            }
        };

        for index in folders.sections(&["libraryfolders"]) {
            push(&folders.value(&["libraryfolders", index.as_str()], "path"));
        }
        let (keys, values) = folders.keys(&["libraryfolders"]);
        for (key, value) in keys.iter().zip(&values) {
            if key.parse::<u32>().is_ok() {
                push(value);
            }
        }
        tracing::debug!(libraries = libraries.len(), "Read Steam library folders");
        libraries
    }

    /// The first manifest for `appid` across all libraries.
    pub fn manifest(&self, appid: AppId) -> Option<AppManifest> {
        let file_name = format!("appmanifest_{appid}.acf");
        self.library_folders().iter().find_map(|library| {
            let path = library.join("steamapps").join(&file_name);
            if !path.is_file() {
                return None;
            }
            let manifest = KeyValues::read(&path);
            Some(AppManifest {
                appid,
                name: manifest.value(&["AppState"], "name"),
                installdir: manifest.value(&["AppState"], "installdir"),
                build_id: manifest.value(&["AppState"], "buildid").parse().ok(),
                library: library.clone(),
            })
        })
    }

    pub fn install_dir(&self, appid: AppId) -> Option<PathBuf> {
        self.manifest(appid).and_then(|manifest| manifest.install_path())
    }

    /// Application ids with a manifest in any library, ascending.
    pub fn installed_apps(&self) -> Vec<AppId> {
        let mut appids: Vec<AppId> = self
            .library_folders()
            .iter()
            .filter_map(|library| std::fs::read_dir(library.join("steamapps")).ok())
            .flatten()
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                let name = name.to_str()?;
                name.strip_prefix("appmanifest_")?.strip_suffix(".acf")?.parse().ok()
            })
            .collect();
        appids.sort_unstable();
        appids.dedup();
        appids
    }

    /// Launch options the user set for `appid`, or empty.
    pub fn user_launch_options(&self, account_id: u32, appid: AppId) -> String {
        let config = KeyValues::read(
            self.root.join("userdata").join(account_id.to_string()).join("config").join("localconfig.vdf"),
        );
        let appid = appid.to_string();
        config.value(&["UserLocalConfigStore", "Software", "Valve", "Steam", "apps", appid.as_str()], "LaunchOptions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn install() -> (TempDir, TempDir, SteamInstall) {
        let root = tempfile::tempdir().unwrap();
        let extra = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("steamapps")).unwrap();
        fs::create_dir_all(extra.path().join("steamapps")).unwrap();
        let library_folders = format!(
            "\"libraryfolders\"\n{{\n\t\"0\"\n\t{{\n\t\t\"path\"\t\t\"{}\"\n\t}}\n\t\"1\"\n\t{{\n\t\t\"path\"\t\t\"{}\"\n\t}}\n}}\n",
            root.path().display(),
            extra.path().display(),
        );
        fs::write(root.path().join("steamapps").join("libraryfolders.vdf"), library_folders).unwrap();
        fs::write(
            extra.path().join("steamapps").join("appmanifest_440.acf"),
            "\"AppState\"\n{\n\t\"appid\"\t\t\"440\"\n\t\"name\"\t\t\"Team Fortress 2\"\n\t\"installdir\"\t\t\"Team Fortress 2\"\n\t\"buildid\"\t\t\"12345\"\n}\n",
        )
        .unwrap();
        fs::write(root.path().join("steamapps").join("appmanifest_220.acf"), "\"AppState\"\n{\n}\n").unwrap();
        let steam = SteamInstall::open(root.path()).unwrap();
        (root, extra, steam)
    }

    #[test]
    fn libraries_are_deduplicated() {
        let (root, extra, steam) = install();
        assert_eq!(steam.library_folders(), vec![root.path().to_path_buf(), extra.path().to_path_buf()]);
    }

    #[test]
    fn libraries_are_read_once() {
        let (root, extra, steam) = install();
        let tf2 = extra.path().join("steamapps").join("common").join("Team Fortress 2");
        assert_eq!(steam.install_dir(440), Some(tf2));
        fs::write(root.path().join("steamapps").join("libraryfolders.vdf"), "\"libraryfolders\"\n{\n}\n").unwrap();
        assert_eq!(steam.library_folders(), vec![root.path().to_path_buf(), extra.path().to_path_buf()]);
        assert!(steam.install_dir(440).is_some());
        assert_eq!(SteamInstall::new(root.path()).library_folders(), vec![root.path().to_path_buf()]);
    }

    #[test]
    fn legacy_library_format() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("steamapps")).unwrap();
        fs::write(
            root.path().join("steamapps").join("libraryfolders.vdf"),
            "\"LibraryFolders\"\n{\n\t\"TimeNextStatsReport\"\t\t\"1700000000\"\n\t\"1\"\t\t\"/mnt/games\"\n}\n",
        )
        .unwrap();
        let steam = SteamInstall::new(root.path());
        assert_eq!(steam.library_folders(), vec![root.path().to_path_buf(), PathBuf::from("/mnt/games")]);
    }

    #[test]
    fn manifest_lookup() {
        let (_root, extra, steam) = install();
        let manifest = steam.manifest(440).unwrap();
        assert_eq!(manifest.name, "Team Fortress 2");
        assert_eq!(manifest.build_id, Some(12345));
        assert_eq!(manifest.library, extra.path());
        assert_eq!(
            steam.install_dir(440),
            Some(extra.path().join("steamapps").join("common").join("Team Fortress 2"))
        );
        assert_eq!(steam.install_dir(220), None);
        assert!(steam.manifest(570).is_none());
    }

    #[test]
    fn installed_apps() {
        let (_root, _extra, steam) = install();
        assert_eq!(steam.installed_apps(), vec![220, 440]);
    }

    #[test]
    fn user_launch_options() {
        let (root, _extra, steam) = install();
        let config_dir = root.path().join("userdata").join("22202").join("config");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join("localconfig.vdf"),
            "\"UserLocalConfigStore\"\n{\n\"Software\"\n{\n\"Valve\"\n{\n\"Steam\"\n{\n\"apps\"\n{\n\"440\"\n{\n\"LaunchOptions\"\t\"-novid -dxlevel 95\"\n}\n}\n}\n}\n}\n}\n",
        )
        .unwrap();
        assert_eq!(steam.user_launch_options(22202, 440), "-novid -dxlevel 95");
        assert_eq!(steam.user_launch_options(22202, 570), "");
        assert_eq!(steam.user_launch_options(1, 440), "");
    }

    #[test]
    fn open_rejects_missing_root() {
        let err = SteamInstall::open("/definitely/not/here").unwrap_err();
        assert!(matches!(*err, ErrorKind::InvalidRoot(_)));
    }

    #[test]
    fn paths() {
        let steam = SteamInstall::new("/steam");
        assert_eq!(steam.appinfo_path(), PathBuf::from("/steam/appcache/appinfo.vdf"));
        assert_eq!(steam.root(), Path::new("/steam"));
    }
}
