//! Layered configuration.
//!
//! Sources, later ones winning:
//!
//! 1. built-in defaults
//! 2. a config file (TOML, YAML or JSON, chosen by extension); either the one
//!    passed in, or `config.{toml,yaml,yml,json}` in the platform config
//!    directory if present
//! 3. environment variables prefixed `APPMETA_`, e.g. `APPMETA_ACCOUNT_ID=22202`

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::instrument;

pub const ENV_PREFIX: &str = "APPMETA_";
const FILE_STEM: &str = "config";
const EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Steam client install; detected when unset.
    pub steam_root: Option<PathBuf>,
    /// Appinfo cache file; defaults to the one inside the install.
    pub appinfo_path: Option<PathBuf>,
    /// 32-bit account id for per-user files and cloud save placeholders.
    pub account_id: Option<u32>,
    /// Keep launch options that can't run on Windows instead of dropping them.
    pub retain_unsupported_launches: bool,
    /// Default log filter when `RUST_LOG` isn't set.
    pub log_level: String,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            steam_root: None,
            appinfo_path: None,
            account_id: None,
            retain_unsupported_launches: false,
            log_level: "info".to_string(),
        }
    }
}
impl Config {
    /// Loads configuration from all sources.
    ///
    /// An explicit `file` must exist; the default location is optional.
    #[instrument(skip_all)]
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => default_file(),
        };
        let figment = figment(file.as_deref())?.merge(Env::prefixed(ENV_PREFIX));
        Self::from_figment(figment)
    }

    /// Extracts and validates configuration from an assembled [`Figment`].
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Invalid)?;
        config.validate()?;
        tracing::debug!(?config, "Loaded configuration");
        Ok(config)
    }

    /// Rejects settings that can't be used as given.
    pub fn validate(&self) -> Result<()> {
        for (field, path) in [("steam_root", &self.steam_root), ("appinfo_path", &self.appinfo_path)] {
            if let Some(path) = path
                && path.is_relative()
            {
                exn::bail!(ErrorKind::RelativePath {
                    field,
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Defaults merged with `file`, if any.
pub fn figment(file: Option<&Path>) -> Result<Figment> {
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let Some(file) = file else {
        return Ok(figment);
    };
    let extension = file.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(file)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(file)),
        Some("json") => figment.merge(Json::file_exact(file)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(file.to_path_buf())),
    })
}

/// Directory searched for a config file when none is given.
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "appmeta").map(|dirs| dirs.config_dir().to_path_buf())
}

fn default_file() -> Option<PathBuf> {
    let dir = config_dir()?;
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{FILE_STEM}.{ext}")))
        .find(|path| path.is_file())
}
