use crate::models::ModManagerConfig;
use crate::services::FolderNameCodec;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// Name of the configuration file inside the configuration directory
pub const CONFIG_FILE_NAME: &str = "ModList Config.yaml";

/// Prefix of environment variables overriding the configuration file
pub const DEFAULT_ENV_PREFIX: &str = "MODLIST";

/// Configuration manager for loading and saving `ModList Config.yaml`.
///
/// Values are layered: defaults, then the YAML file (optional), then environment
/// variables. Nested keys use a double underscore, e.g. `MODLIST_WATCH__ECHO_WINDOW_MS`.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
    env_prefix: Option<String>,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing the configuration file (e.g., "ModList Data")
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        // Create config directory if it doesn't exist
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
            env_prefix: Some(DEFAULT_ENV_PREFIX.to_string()),
        })
    }

    /// Use a different environment prefix, or none to ignore the environment
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: Option<&str>) -> Self {
        self.env_prefix = prefix.map(str::to_string);
        self
    }

    /// Load the configuration.
    ///
    /// # Returns
    /// The merged ModManagerConfig; defaults if neither file nor environment set anything
    ///
    /// # Errors
    /// Fails on unreadable or malformed YAML, on environment values of the wrong type,
    /// and on invalid disabled markers.
    pub fn load_config(&self) -> Result<ModManagerConfig> {
        if !self.config_path.exists() {
            tracing::warn!(
                "Config file not found at {}, using defaults",
                self.config_path
            );
        }

        let mut builder = Config::builder().add_source(
            File::from(self.config_path.as_std_path())
                .format(FileFormat::Yaml)
                .required(false),
        );
        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: ModManagerConfig = builder
            .build()
            .and_then(|config| config.try_deserialize())
            .with_context(|| format!("Failed to load config: {}", self.config_path))?;

        FolderNameCodec::from_config(&config.markers)
            .with_context(|| format!("Invalid markers in config: {}", self.config_path))?;

        tracing::info!(
            characters = config.characters.len(),
            "Loaded config from {}",
            self.config_path
        );
        Ok(config)
    }

    /// Save the configuration file.
    ///
    /// # Arguments
    /// * `config` - The ModManagerConfig to save
    pub fn save_config(&self, config: &ModManagerConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize config to YAML")?;

        fs::write(&self.config_path, yaml_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Get the configuration file path.
    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}
