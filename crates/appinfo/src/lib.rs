//! In-memory reader for the Steam `appinfo.vdf` cache.
//!
//! The file is a small header followed by one record per application, each a
//! fixed header and a binary KeyValues blob:
//!
//! ```text
//! version: u32, universe: u32
//! { appid, size, state, last_update, access_token, sha1[20], change_num [, binary_sha1[20]] } blob[size]
//! ...
//! appid = 0
//! ```
//!
//! The format is undocumented and owned by a third party. Nothing here fails
//! on bad data: an unreadable file or malformed header yields an empty
//! cache, an unknown version is read with the newest known layout, and a
//! broken record ends the scan.

mod cache;
pub mod error;
pub mod header;
mod record;

pub use crate::cache::{AppInfoCache, Entry, Records};
pub use crate::header::{Header, Layout};
pub use crate::record::{AppId, AppInfoRecord, SENTINEL_APPID};
