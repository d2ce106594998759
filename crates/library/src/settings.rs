use crate::error::{ErrorKind, Result};
use appmeta_config::Config;
use appmeta_resolve::{ResolveOptions, SaveRoots, SteamInstall};
use exn::ResultExt;
use std::path::PathBuf;

/// What the worker needs to know to load and resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub appinfo_path: PathBuf,
    pub steam: Option<SteamInstall>,
    pub resolve: ResolveOptions,
}
impl Settings {
    pub fn new(appinfo_path: impl Into<PathBuf>) -> Self {
        Self {
            appinfo_path: appinfo_path.into(),
            steam: None,
            resolve: ResolveOptions::default(),
        }
    }

    /// Derives settings from configuration, detecting the Steam install when
    /// none is configured.
    ///
    /// A configured install must exist. A missing detected one is only an
    /// error when no appinfo path is configured either.
    pub fn from_config(config: &Config) -> Result<Self> {
        let steam = match &config.steam_root {
            Some(root) => Some(SteamInstall::open(root).or_raise(|| ErrorKind::Steam)?),
            None => SteamInstall::detect()
                .inspect_err(|err| tracing::debug!(error = %**err, "Steam auto-detection failed"))
                .ok(),
        };
        let appinfo_path = match (&config.appinfo_path, &steam) {
            (Some(path), _) => path.clone(),
            (None, Some(steam)) => steam.appinfo_path(),
            (None, None) => exn::bail!(ErrorKind::NoCache),
        };
        Ok(Self {
            appinfo_path,
            steam,
            resolve: ResolveOptions {
                retain_unsupported: config.retain_unsupported_launches,
                account_id: config.account_id,
                roots: SaveRoots::from_system(),
            },
        })
    }
}
