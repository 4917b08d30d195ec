use crate::models::ModDescriptor;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Stable identity of a tracked mod, independent of its folder name
///
/// Assigned once when a folder is first tracked and kept across every rename, including
/// renames made outside the program and observed through the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModId(Uuid);

impl ModId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ModId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ModId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for ModId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Enabled/disabled state of a mod entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModState {
    Enabled,
    Disabled,
}

impl ModState {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }

    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }
}

impl fmt::Display for ModState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => f.write_str("enabled"),
            Self::Disabled => f.write_str("disabled"),
        }
    }
}

/// A mod folder tracked by a [`ModList`](crate::state::ModList)
///
/// Entries handed out by the mod list are snapshots; the enabled flag and descriptor only
/// change through the owning list's operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModEntry {
    id: ModId,
    descriptor: ModDescriptor,
    enabled: bool,
    owner: Arc<str>,
}

impl ModEntry {
    pub(crate) fn new(descriptor: ModDescriptor, owner: Arc<str>, enabled: bool) -> Self {
        Self {
            id: ModId::new(),
            descriptor,
            enabled,
            owner,
        }
    }

    pub fn id(&self) -> ModId {
        self.id
    }

    pub fn descriptor(&self) -> &ModDescriptor {
        &self.descriptor
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> ModState {
        ModState::from_enabled(self.enabled)
    }

    /// Character id of the owning mod list
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn path(&self) -> &Utf8Path {
        self.descriptor.path()
    }

    pub fn folder_name(&self) -> &str {
        self.descriptor.folder_name()
    }

    pub fn display_name(&self) -> &str {
        self.descriptor.display_name()
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn replace_descriptor(&mut self, descriptor: ModDescriptor) {
        self.descriptor = descriptor;
    }

    pub(crate) fn descriptor_mut(&mut self) -> &mut ModDescriptor {
        &mut self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_get_distinct_ids() {
        let owner: Arc<str> = Arc::from("keqing");
        let a = ModEntry::new(ModDescriptor::new("/mods/a").unwrap(), owner.clone(), true);
        let b = ModEntry::new(ModDescriptor::new("/mods/b").unwrap(), owner, false);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.state(), ModState::Enabled);
        assert_eq!(b.state(), ModState::Disabled);
        assert_eq!(a.owner(), "keqing");
    }

    #[test]
    fn test_replace_descriptor_keeps_id() {
        let mut entry = ModEntry::new(
            ModDescriptor::new("/mods/Alice").unwrap(),
            Arc::from("keqing"),
            true,
        );
        let id = entry.id();
        entry.replace_descriptor(ModDescriptor::new("/mods/DISABLED_Alice").unwrap());
        entry.set_enabled(false);
        assert_eq!(entry.id(), id);
        assert_eq!(entry.folder_name(), "DISABLED_Alice");
        assert!(!entry.is_enabled());
    }

    #[test]
    fn test_mod_id_round_trips_through_uuid() {
        let id = ModId::new();
        assert_eq!(ModId::from(id.as_uuid()), id);
        assert_eq!(id.to_string(), id.as_uuid().to_string());
    }
}
