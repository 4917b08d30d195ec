//! Data models for mod lists.
//!
//! - [`ModDescriptor`]: identity and metadata of one mod folder (path, custom name)
//! - [`ModEntry`]: a descriptor bound to an enabled flag and a stable [`ModId`]
//! - [`ModManagerConfig`]: configuration loaded from `ModList Config.yaml`
//!
//! # Architecture Note
//!
//! Entries are owned by [`ModList`](crate::state::ModList) and only change through its
//! operations. Everything the list hands out is a cloned snapshot, so readers never
//! observe a half-applied rename.

pub mod config;
pub mod descriptor;
pub mod entry;

pub use config::{
    CharacterConfig, DeletionSettings, LogSettings, MarkerConfig, ModManagerConfig, WatchSettings,
};
pub use descriptor::ModDescriptor;
pub use entry::{ModEntry, ModId, ModState};
