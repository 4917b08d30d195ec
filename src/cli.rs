//! Command line front end.
//!
//! `modlist watch` keeps every configured mod list open and reports changes until Ctrl-C.
//! The remaining commands open the lists without an OS watcher, perform one operation
//! and exit.

use crate::config::ConfigManager;
use crate::logging;
use crate::models::{ModEntry, ModManagerConfig};
use crate::state::{ModList, ModListRegistry, ModsChanged};
use crate::watch::{ManualWatchSource, NotifyWatchSource};
use crate::{APP_NAME, VERSION};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Parser)]
#[command(name = "modlist", version, about = "Manage per-character mod folders")]
pub struct Cli {
    /// Directory containing `ModList Config.yaml`
    #[arg(long, env = "MODLIST_CONFIG_DIR", default_value = "ModList Data")]
    pub config_dir: Utf8PathBuf,

    /// Log at debug level
    #[arg(long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Watch all mods folders and report changes (default)
    Watch,

    /// List tracked mods
    List {
        /// Only list this character
        character: Option<String>,
    },

    /// Enable a disabled mod
    Enable { character: String, folder: String },

    /// Disable an enabled mod
    Disable { character: String, folder: String },

    /// Move a mod to the recycle directory, or delete it outright
    Delete {
        character: String,
        folder: String,

        /// Delete instead of recycling
        #[arg(long)]
        permanent: bool,
    },
}

/// Load configuration, start logging and execute the selected command
pub fn run(cli: Cli) -> Result<()> {
    let config_manager = ConfigManager::new(&cli.config_dir)?;
    let config = config_manager.load_config()?;

    let mut log_settings = config.logging.clone();
    log_settings.debug |= cli.debug;
    let _guard = logging::setup_logging_from_settings(&log_settings)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => watch(&config),
        Command::List { character } => list(&config, character.as_deref()),
        Command::Enable { character, folder } => {
            with_entry(&config, &character, &folder, |list, entry| {
                list.enable(entry.id()).map_err(Into::into)
            })
        }
        Command::Disable { character, folder } => {
            with_entry(&config, &character, &folder, |list, entry| {
                list.disable(entry.id()).map_err(Into::into)
            })
        }
        Command::Delete {
            character,
            folder,
            permanent,
        } => with_entry(&config, &character, &folder, |list, entry| {
            list.delete_entry(entry.id(), !permanent)
                .map_err(Into::into)
        }),
    }
}

fn watch(config: &ModManagerConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("modlist-worker")
        .build()?;

    let source = NotifyWatchSource::new(&config.watch);
    let registry = ModListRegistry::open(config, &source)?;

    for list in registry.lists() {
        let character = list.display_name().to_string();
        list.observe(move |change| {
            tracing::debug!(character = %character, change_type = ?change.change_type(), "Mods changed");
        });

        let character = list.display_name().to_string();
        let mut events = list.subscribe();
        runtime.spawn(async move {
            loop {
                match events.recv().await {
                    Ok(change) => println!("[{character}] {change}"),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(character = %character, skipped, "Change reporter fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    println!(
        "Watching {} mods across {} characters, press Ctrl-C to stop",
        registry.total_mods(),
        registry.len()
    );

    runtime.block_on(async {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")
    })?;

    tracing::info!("Shutting down");
    registry.log_metrics();
    drop(registry);

    runtime.shutdown_timeout(Duration::from_secs(5));
    Ok(())
}

fn list(config: &ModManagerConfig, character: Option<&str>) -> Result<()> {
    let registry = ModListRegistry::open(config, &ManualWatchSource::new())?;

    let lists: Vec<&ModList> = match character {
        Some(character) => vec![find_list(&registry, character)?],
        None => registry.lists().collect(),
    };

    for list in lists {
        println!("{list}");
        for entry in list.entries() {
            println!("{}", format_entry(&entry));
        }
    }
    Ok(())
}

fn with_entry<F>(config: &ModManagerConfig, character: &str, folder: &str, op: F) -> Result<()>
where
    F: FnOnce(&ModList, &ModEntry) -> Result<ModsChanged>,
{
    let registry = ModListRegistry::open(config, &ManualWatchSource::new())?;
    let list = find_list(&registry, character)?;
    let entry = list
        .find_by_folder_name(folder)
        .with_context(|| format!("No mod named {folder} for {}", list.display_name()))?;

    let change = op(list, &entry)?;
    println!("{change}");
    Ok(())
}

fn find_list<'a>(registry: &'a ModListRegistry, character: &str) -> Result<&'a ModList> {
    registry
        .get(character)
        .with_context(|| format!("Unknown character: {character}"))
}

fn format_entry(entry: &ModEntry) -> String {
    let mark = if entry.is_enabled() { "x" } else { " " };
    match entry.descriptor().custom_name() {
        Some(custom) => format!("  [{mark}] {} ({custom})", entry.folder_name()),
        None => format!("  [{mark}] {}", entry.folder_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_delete() {
        let cli =
            Cli::try_parse_from(["modlist", "delete", "keqing", "Alice", "--permanent"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Delete {
                character: "keqing".to_string(),
                folder: "Alice".to_string(),
                permanent: true,
            })
        );
    }

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["modlist", "--config-dir", "/tmp/modlist"]).unwrap();
        assert_eq!(cli.config_dir, Utf8PathBuf::from("/tmp/modlist"));
        assert!(!cli.debug);
        assert!(cli.command.is_none());
    }
}
