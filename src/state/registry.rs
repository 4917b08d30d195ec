use super::{ModList, ModListOptions};
use crate::error::{ModListError, Result};
use crate::models::{ModEntry, ModId, ModManagerConfig};
use crate::services::{FolderNameCodec, FsDeleter};
use crate::watch::WatchSource;
use indexmap::IndexMap;
use std::fs;
use std::sync::Arc;

/// All mod lists of one installation, keyed by character id
///
/// Each character owns its own [`ModList`]; a mod id is unique across the registry, so
/// [`find_entry`](Self::find_entry) can resolve it without knowing the owner.
#[derive(Debug, Default)]
pub struct ModListRegistry {
    lists: IndexMap<String, ModList>,
}

impl ModListRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a mod list for every configured character, creating missing mods folders.
    ///
    /// # Errors
    ///
    /// Fails if `mods_root` is not configured, the markers are invalid, two characters
    /// share an id, or any list fails to open.
    pub fn open(config: &ModManagerConfig, source: &dyn WatchSource) -> Result<Self> {
        if config.mods_root.trim().is_empty() {
            return Err(ModListError::Config("mods_root is not set".to_string()));
        }

        let codec = FolderNameCodec::from_config(&config.markers)?;
        let mut registry = Self::new();

        for character in &config.characters {
            let root = config.character_root(character);
            fs::create_dir_all(&root)
                .map_err(|e| ModListError::io(format!("Failed to create mods folder {root}"), e))?;

            let deleter = Arc::new(FsDeleter::new(config.deletion.recycle_dir_for(&root)));
            let options = ModListOptions::new(character.id.clone(), root)
                .display_name(character.display_name())
                .codec(codec.clone())
                .deleter(deleter)
                .watch_settings(&config.watch);

            registry.insert(ModList::open(options, source)?)?;
        }

        tracing::info!(
            characters = registry.len(),
            mods = registry.total_mods(),
            "Opened mod lists"
        );
        Ok(registry)
    }

    /// Add a list under its owner id
    pub fn insert(&mut self, list: ModList) -> Result<()> {
        if self.lists.contains_key(list.owner()) {
            return Err(ModListError::Config(format!(
                "Character {} is configured twice",
                list.owner()
            )));
        }
        self.lists.insert(list.owner().to_string(), list);
        Ok(())
    }

    /// Remove a list; dropping it disposes its watcher
    pub fn remove(&mut self, owner: &str) -> Option<ModList> {
        self.lists.shift_remove(owner)
    }

    /// Look up a list by character id, falling back to an ASCII case-insensitive match
    pub fn get(&self, owner: &str) -> Option<&ModList> {
        self.lists.get(owner).or_else(|| {
            self.lists
                .iter()
                .find(|(id, _)| id.eq_ignore_ascii_case(owner))
                .map(|(_, list)| list)
        })
    }

    pub fn lists(&self) -> impl Iterator<Item = &ModList> {
        self.lists.values()
    }

    /// Find a mod and the list that owns it
    pub fn find_entry(&self, id: ModId) -> Option<(&ModList, ModEntry)> {
        self.lists
            .values()
            .find_map(|list| list.get(id).map(|entry| (list, entry)))
    }

    pub fn total_mods(&self) -> usize {
        self.lists.values().map(ModList::len).sum()
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn log_metrics(&self) {
        for list in self.lists.values() {
            list.metrics().log_summary(list.display_name());
        }
    }
}
