//! Integration tests for ModListRegistry
//!
//! These tests verify that the registry opens one mod list per configured character and
//! resolves mods across lists.

use camino::Utf8PathBuf;
use modlist::models::{CharacterConfig, ModManagerConfig};
use modlist::watch::{ManualWatchSource, WatchEvent};
use modlist::{ModId, ModListError, ModListRegistry};
use std::fs;
use tempfile::TempDir;

fn create_config() -> (TempDir, ModManagerConfig) {
    let temp_dir = TempDir::new().unwrap();
    let mods_root = Utf8PathBuf::try_from(temp_dir.path().join("Mods")).unwrap();

    let mut hu_tao = CharacterConfig::new("hu_tao");
    hu_tao.display_name = "Hu Tao".to_string();
    hu_tao.folder = Some("HuTao".to_string());

    let config = ModManagerConfig {
        mods_root: mods_root.to_string(),
        characters: vec![CharacterConfig::new("keqing"), hu_tao],
        ..Default::default()
    };
    (temp_dir, config)
}

#[test]
fn test_open_creates_missing_character_folders() {
    let (_temp_dir, config) = create_config();

    let registry = ModListRegistry::open(&config, &ManualWatchSource::new()).unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.total_mods(), 0);
    let mods_root = Utf8PathBuf::from(&config.mods_root);
    assert!(mods_root.join("keqing").is_dir());
    assert!(mods_root.join("HuTao").is_dir());
    assert_eq!(registry.get("hu_tao").unwrap().display_name(), "Hu Tao");
}

#[test]
fn test_lookup_is_case_insensitive() {
    let (_temp_dir, config) = create_config();
    let registry = ModListRegistry::open(&config, &ManualWatchSource::new()).unwrap();

    assert!(registry.get("KEQING").is_some());
    assert!(registry.get("nahida").is_none());
}

#[test]
fn test_find_entry_across_lists() {
    let (_temp_dir, config) = create_config();
    let mods_root = Utf8PathBuf::from(&config.mods_root);
    fs::create_dir_all(mods_root.join("keqing").join("Alice")).unwrap();
    fs::create_dir_all(mods_root.join("HuTao").join("DISABLED_Bob")).unwrap();

    let registry = ModListRegistry::open(&config, &ManualWatchSource::new()).unwrap();
    let bob = registry
        .get("hu_tao")
        .unwrap()
        .find_by_folder_name("DISABLED_Bob")
        .unwrap();

    let (owner, entry) = registry.find_entry(bob.id()).unwrap();
    assert_eq!(owner.owner(), "hu_tao");
    assert_eq!(entry.owner(), "hu_tao");
    assert!(!entry.is_enabled());
    assert!(registry.find_entry(ModId::new()).is_none());
    assert_eq!(registry.total_mods(), 2);
}

#[test]
fn test_events_reach_only_the_owning_list() {
    let (_temp_dir, config) = create_config();
    let source = ManualWatchSource::new();
    let registry = ModListRegistry::open(&config, &source).unwrap();

    let keqing = registry.get("keqing").unwrap();
    let alice = keqing.root().join("Alice");
    fs::create_dir(&alice).unwrap();
    source.emit(WatchEvent::Created(alice));

    assert_eq!(keqing.len(), 1);
    assert!(registry.get("hu_tao").unwrap().is_empty());
}

#[test]
fn test_missing_mods_root_is_rejected() {
    let config = ModManagerConfig::default();

    let result = ModListRegistry::open(&config, &ManualWatchSource::new());

    assert!(matches!(result, Err(ModListError::Config(_))));
}

#[test]
fn test_duplicate_character_is_rejected() {
    let (_temp_dir, mut config) = create_config();
    config.characters.push(CharacterConfig::new("keqing"));

    let result = ModListRegistry::open(&config, &ManualWatchSource::new());

    assert!(matches!(result, Err(ModListError::Config(_))));
}

#[test]
fn test_remove_disposes_list() {
    let (_temp_dir, config) = create_config();
    let source = ManualWatchSource::new();
    let mut registry = ModListRegistry::open(&config, &source).unwrap();
    assert_eq!(source.subscription_count(), 2);

    drop(registry.remove("keqing").unwrap());

    assert_eq!(registry.len(), 1);
    assert_eq!(source.subscription_count(), 1);
}
