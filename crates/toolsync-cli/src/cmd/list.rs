//! The `list` subcommand.

use std::path::Path;

use anyhow::Result;

use crate::state_file;

/// Print the tools, settings, and fonts recorded in the state file.
pub fn list(state_path: &Path) -> Result<()> {
    let state = state_file::load(state_path);

    if state.tools.is_empty() && state.fonts.is_empty() {
        println!("nothing recorded in {}", state_path.display());
        return Ok(());
    }

    for (name, record) in &state.tools {
        let version = if record.version.is_empty() {
            "latest"
        } else {
            record.version.as_str()
        };
        let origin = record
            .source
            .map_or("unknown", |s| s.as_str());
        println!(
            "{name:<24} {version:<12} {origin:<18} {}",
            record.install_path.display()
        );
    }

    for (name, record) in &state.fonts {
        println!("{name:<24} {:<12} font", record.files.len());
    }

    Ok(())
}
