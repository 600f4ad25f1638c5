//! TOML configuration loading.
//!
//! The declaration lives in one document:
//!
//! ```toml
//! [[tools]]
//! name = "ripgrep"
//! version = "14.1.0"
//! source = "github-release"
//! repo = "BurntSushi/ripgrep"
//!
//! [[settings]]
//! domain = "com.apple.finder"
//! key = "AppleShowAllFiles"
//! value = "true"
//! type = "bool"
//!
//! [aliases]
//! entries = [{ name = "gs", value = "git status" }]
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use toolsync_schema::{AliasConfig, FontSpec, Setting, ToolSpec};

/// Errors that can occur when loading or parsing the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading the config file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML content could not be deserialized.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// The full declaration: tools, settings, aliases, fonts.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Tools to keep installed.
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
    /// macOS settings to apply.
    #[serde(default)]
    pub settings: Vec<Setting>,
    /// Shell aliases to append.
    #[serde(default)]
    pub aliases: AliasConfig,
    /// Fonts to keep installed.
    #[serde(default)]
    pub fonts: Vec<FontSpec>,
}

/// Load the configuration from a TOML file on disk.
///
/// # Errors
///
/// Returns `ConfigError::Io` if the file cannot be read, or
/// `ConfigError::Parse` if the TOML content is invalid.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse(&content)
}

/// Parse the configuration from a TOML string.
///
/// # Errors
///
/// Returns `ConfigError::Parse` if the TOML content is invalid.
pub fn parse(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}
