use crate::services::codec::{DEFAULT_LEGACY_MARKER, DEFAULT_PRIMARY_MARKER};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration from `ModList Config.yaml`
///
/// Every section has defaults, so an empty or missing file yields a usable configuration
/// apart from `mods_root` and `characters`, which describe the user's installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModManagerConfig {
    /// Directory containing one mod folder per character
    #[serde(default)]
    pub mods_root: String,

    #[serde(default)]
    pub characters: Vec<CharacterConfig>,

    #[serde(default)]
    pub markers: MarkerConfig,

    #[serde(default)]
    pub watch: WatchSettings,

    #[serde(default)]
    pub deletion: DeletionSettings,

    #[serde(default)]
    pub logging: LogSettings,
}

impl Default for ModManagerConfig {
    fn default() -> Self {
        Self {
            mods_root: String::new(),
            characters: Vec::new(),
            markers: MarkerConfig::default(),
            watch: WatchSettings::default(),
            deletion: DeletionSettings::default(),
            logging: LogSettings::default(),
        }
    }
}

impl ModManagerConfig {
    /// Find a character by id, ignoring ASCII case
    pub fn character(&self, id: &str) -> Option<&CharacterConfig> {
        self.characters
            .iter()
            .find(|character| character.id.eq_ignore_ascii_case(id))
    }

    /// Absolute mods folder for a character
    pub fn character_root(&self, character: &CharacterConfig) -> Utf8PathBuf {
        Utf8Path::new(&self.mods_root).join(character.folder_name())
    }
}

/// A logical owner of one mod folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterConfig {
    pub id: String,

    #[serde(default)]
    pub display_name: String,

    /// Folder name under `mods_root`; defaults to the id
    #[serde(default)]
    pub folder: Option<String>,
}

impl CharacterConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: String::new(),
            folder: None,
        }
    }

    pub fn display_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.id
        } else {
            &self.display_name
        }
    }

    pub fn folder_name(&self) -> &str {
        self.folder.as_deref().unwrap_or(&self.id)
    }
}

/// Disabled folder markers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerConfig {
    #[serde(default = "default_primary_marker")]
    pub primary: String,

    #[serde(default = "default_legacy_marker")]
    pub legacy: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            primary: default_primary_marker(),
            legacy: default_legacy_marker(),
        }
    }
}

fn default_primary_marker() -> String {
    DEFAULT_PRIMARY_MARKER.to_string()
}

fn default_legacy_marker() -> String {
    DEFAULT_LEGACY_MARKER.to_string()
}

/// Filesystem watcher timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchSettings {
    /// How long a self-inflicted change is remembered so its late notification can be discarded
    #[serde(default = "default_echo_window_ms")]
    pub echo_window_ms: u64,

    /// How long a "renamed from" notification waits for its "renamed to" half
    #[serde(default = "default_rename_pair_window_ms")]
    pub rename_pair_window_ms: u64,
}

impl WatchSettings {
    pub fn echo_window(&self) -> Duration {
        Duration::from_millis(self.echo_window_ms)
    }

    pub fn rename_pair_window(&self) -> Duration {
        Duration::from_millis(self.rename_pair_window_ms)
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            echo_window_ms: default_echo_window_ms(),
            rename_pair_window_ms: default_rename_pair_window_ms(),
        }
    }
}

fn default_echo_window_ms() -> u64 {
    2000
}

fn default_rename_pair_window_ms() -> u64 {
    250
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionSettings {
    /// Recycle directory; relative paths are resolved against the parent of each
    /// character's mods folder so it is never inside a watched directory
    #[serde(default = "default_recycle_dir")]
    pub recycle_dir: String,
}

impl DeletionSettings {
    pub fn recycle_dir_for(&self, character_root: &Utf8Path) -> Utf8PathBuf {
        let recycle_dir = Utf8Path::new(&self.recycle_dir);
        if recycle_dir.is_absolute() {
            return recycle_dir.to_path_buf();
        }
        character_root
            .parent()
            .unwrap_or(character_root)
            .join(recycle_dir)
    }
}

impl Default for DeletionSettings {
    fn default() -> Self {
        Self {
            recycle_dir: default_recycle_dir(),
        }
    }
}

fn default_recycle_dir() -> String {
    ".modlist-trash".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_log_dir")]
    pub dir: String,

    #[serde(default = "default_log_prefix")]
    pub prefix: String,

    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_console")]
    pub console: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            prefix: default_log_prefix(),
            debug: false,
            console: default_console(),
        }
    }
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_prefix() -> String {
    "modlist".to_string()
}

fn default_console() -> bool {
    true
}
