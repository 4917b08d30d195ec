//! ModList - per-character mod folders with live filesystem reconciliation
//!
//! Main entry point for the command line application.
//!
//! # Execution Flow
//!
//! 1. Parse arguments ([`Cli`])
//! 2. Load `ModList Config.yaml` from the config directory (default `ModList Data/`),
//!    with `MODLIST_*` environment overrides
//! 3. Initialize logging → logs/modlist.<date>
//! 4. Run the command; `watch` (the default) keeps every mod list open until Ctrl-C
//!
//! # Platform
//!
//! Cross-platform via notify; Windows mods folders are the primary target.

use anyhow::Result;
use clap::Parser;
use modlist::cli::{self, Cli};

fn main() -> Result<()> {
    cli::run(Cli::parse())
}
