//! Per-application metadata resolved from appinfo sections.
//!
//! [`Resolver`] walks the sections of one application's blob once and
//! produces an [`ApplicationMetadata`]: common attributes, launch options
//! (validated, compacted to dense ids, de-duplicated and with the primary
//! option first), branches and cloud save locations. [`SteamInstall`] finds
//! the files around the cache: libraries, manifests and per-user config.
//!
//! ```no_run
//! use appmeta_appinfo::AppInfoCache;
//! use appmeta_resolve::{ResolveOptions, Resolver, SteamInstall};
//!
//! let steam = SteamInstall::detect()?;
//! let cache = AppInfoCache::load(steam.appinfo_path());
//! let mut resolver = Resolver::new(ResolveOptions::default()).with_steam(steam);
//! if let Some(metadata) = resolver.resolve_app(&cache, 440) {
//!     println!("{}: {:?}", metadata.name, metadata.primary_launch());
//! }
//! # Ok::<(), appmeta_resolve::error::Error>(())
//! ```

pub mod error;
mod models;
mod resolve;
mod steam;

pub use crate::models::{
    AppType, ApplicationMetadata, BranchRecord, CloudSaveRecord, CpuArch, LaunchConfig, LaunchType, Platforms,
};
pub use crate::resolve::{ResolveOptions, Resolver, SaveRoots, normalize_cpu_arch};
pub use crate::steam::{AppManifest, SteamInstall};
