//! JSON state persistence.
//!
//! The state file is the idempotency record: a human-readable JSON
//! document keyed by resource name. A missing or unreadable file loads
//! as an empty store, never as an error.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use toolsync_schema::StateStore;

/// Load the state store, falling back to an empty store on any failure.
pub fn load(path: &Path) -> StateStore {
    let Ok(content) = fs::read_to_string(path) else {
        tracing::debug!(path = %path.display(), "no state file, starting empty");
        return StateStore::default();
    };
    match serde_json::from_str(&content) {
        Ok(state) => state,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "unreadable state file, starting empty");
            StateStore::default()
        }
    }
}

/// Write the state store as pretty-printed JSON.
///
/// # Errors
///
/// Fails when serialization or the file write fails.
pub fn save(path: &Path, state: &StateStore) -> Result<()> {
    let json = serde_json::to_string_pretty(state).context("failed to serialize state")?;
    fs::write(path, json).with_context(|| format!("failed to write state file {}", path.display()))
}
