// ModList - per-character mod folders with live filesystem reconciliation
//
// This is the library crate containing the mod list engine and its collaborators.
// The binary crate (main.rs) provides the command line entry point.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod watch;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use error::{ModListError, Result};
pub use models::{ModDescriptor, ModEntry, ModId, ModManagerConfig, ModState};
pub use state::{ChangeType, ModList, ModListOptions, ModListRegistry, ModsChanged};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
