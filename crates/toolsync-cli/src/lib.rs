//! toolsync - declarative dev tool synchronization for macOS
//!
//! Reads a TOML declaration of tools, macOS settings, shell aliases,
//! and fonts, reconciles the machine against it, and records what it
//! did in a JSON state file so repeated runs only apply the drift.

pub mod aliases;
pub mod cmd;
pub mod config;
pub mod console;
pub mod settings;
pub mod state_file;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command line interface definition.
#[derive(Debug, Parser)]
#[command(name = "toolsync")]
#[command(author, version, about = "toolsync - declarative dev tool sync for macOS")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "tools.toml")]
    pub config: PathBuf,

    /// Path to the persisted state file
    #[arg(long, global = true, default_value = "state.json")]
    pub state: PathBuf,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reconcile the machine with the config (everything, or one area)
    Sync {
        #[command(subcommand)]
        target: Option<SyncTarget>,
    },
    /// List tools recorded in the state file
    List,
}

/// A single area to sync instead of everything.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum SyncTarget {
    /// Sync only tools
    Tools,
    /// Sync only macOS settings
    Settings,
    /// Sync only shell aliases
    Aliases,
    /// Sync only fonts
    Fonts,
}
