//! Integration tests for ConfigManager and configuration file handling
//!
//! These tests verify:
//! - Configuration loading and saving
//! - Defaults for missing sections
//! - Environment overrides
//! - Marker validation

use camino::Utf8PathBuf;
use modlist::ConfigManager;
use modlist::models::{CharacterConfig, ModManagerConfig};
use std::fs;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert_eq!(manager.config_dir(), &config_path);
    assert_eq!(
        manager.config_path(),
        config_path.join("ModList Config.yaml").as_path()
    );
}

#[test]
fn test_config_dir_is_created() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let nested = config_path.join("ModList Data");

    ConfigManager::new(&nested).unwrap();

    assert!(nested.is_dir());
}

#[test]
fn test_partial_file_fills_defaults() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path)
        .unwrap()
        .with_env_prefix(None);

    fs::write(
        manager.config_path(),
        r#"
mods_root: /games/mods
characters:
  - id: keqing
    display_name: Keqing
  - id: hu_tao
    folder: HuTao
watch:
  echo_window_ms: 1500
"#,
    )
    .unwrap();

    let config = manager.load_config().unwrap();

    assert_eq!(config.mods_root, "/games/mods");
    assert_eq!(config.characters.len(), 2);
    assert_eq!(config.characters[0].display_name(), "Keqing");
    assert_eq!(config.characters[1].folder_name(), "HuTao");
    assert_eq!(config.watch.echo_window_ms, 1500);
    assert_eq!(config.watch.rename_pair_window_ms, 250);
    assert_eq!(config.markers.primary, "DISABLED_");
    assert_eq!(config.deletion.recycle_dir, ".modlist-trash");
    assert!(config.logging.console);
}

#[test]
fn test_save_then_load() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path)
        .unwrap()
        .with_env_prefix(None);

    let mut config = ModManagerConfig {
        mods_root: "/games/mods".to_string(),
        ..Default::default()
    };
    config.characters.push(CharacterConfig::new("keqing"));
    config.markers.primary = "OFF_".to_string();
    config.markers.legacy = "OFF".to_string();
    manager.save_config(&config).unwrap();

    assert!(manager.config_path().exists());
    assert_eq!(manager.load_config().unwrap(), config);
}

#[test]
fn test_environment_overrides_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path)
        .unwrap()
        .with_env_prefix(Some("MODLIST_ENV_TEST"));
    fs::write(manager.config_path(), "mods_root: /from/file\n").unwrap();

    // The prefix is unique to this test, so no other test observes these variables
    unsafe {
        std::env::set_var("MODLIST_ENV_TEST_MODS_ROOT", "/from/env");
        std::env::set_var("MODLIST_ENV_TEST_WATCH__ECHO_WINDOW_MS", "750");
    }

    let config = manager.load_config().unwrap();

    assert_eq!(config.mods_root, "/from/env");
    assert_eq!(config.watch.echo_window_ms, 750);
}

#[test]
fn test_malformed_yaml_is_an_error() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path)
        .unwrap()
        .with_env_prefix(None);
    fs::write(manager.config_path(), "characters: [unclosed\n").unwrap();

    assert!(manager.load_config().is_err());
}
