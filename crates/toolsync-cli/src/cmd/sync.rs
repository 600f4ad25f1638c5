//! The `sync` subcommand.

use std::path::Path;

use anyhow::{Context, Result};

use crate::{SyncTarget, aliases, config, settings, state_file};
use toolsync_core::fonts::FontSync;
use toolsync_core::{Dirs, Reporter, Synchronizer};

/// Reconcile the machine with the config, then persist the state.
pub async fn sync<R: Reporter + Clone + Send + Sync + 'static>(
    config_path: &Path,
    state_path: &Path,
    target: Option<SyncTarget>,
    reporter: R,
) -> Result<()> {
    let cfg = config::load(config_path)
        .with_context(|| format!("cannot load config {}", config_path.display()))?;
    let mut state = state_file::load(state_path);
    let dirs = Dirs::standard();

    match target {
        None => {
            Synchronizer::new(reporter.clone(), dirs.clone())
                .reconcile(&cfg.tools, &mut state)
                .await;
            settings::sync_settings(&cfg.settings, &mut state, &reporter);
            aliases::sync_aliases(&cfg.aliases, &reporter);
            FontSync::new(reporter.clone(), dirs)
                .sync(&cfg.fonts, &mut state)
                .await;
        }
        Some(SyncTarget::Tools) => {
            Synchronizer::new(reporter.clone(), dirs)
                .reconcile(&cfg.tools, &mut state)
                .await;
        }
        Some(SyncTarget::Settings) => {
            settings::sync_settings(&cfg.settings, &mut state, &reporter);
        }
        Some(SyncTarget::Aliases) => {
            aliases::sync_aliases(&cfg.aliases, &reporter);
        }
        Some(SyncTarget::Fonts) => {
            FontSync::new(reporter.clone(), dirs)
                .sync(&cfg.fonts, &mut state)
                .await;
        }
    }

    // State is persisted even when individual tools failed: per-tool
    // failures leave their entries untouched.
    state_file::save(state_path, &state)?;
    Ok(())
}
