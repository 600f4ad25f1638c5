//! toolsync-core - the tool synchronization engine.
//!
//! Reconciles a declared tool list against the machine: installs what is
//! missing, upgrades what drifted, removes what was dropped from the
//! declaration. Install work is dispatched per source kind (GitHub
//! release archives, direct URLs, Homebrew, `go install`, rustup
//! components); downloaded archives go through a multi-format extractor
//! that locates and places executables.
//!
//! The engine is a pure library: no process exits, no global logging
//! state. Progress and failures flow through the [`Reporter`] capability
//! passed into each component, and every per-tool failure is isolated to
//! that tool.

pub mod fonts;
pub mod install;
pub mod io;
pub mod paths;
mod process;
pub mod release;
pub mod reporter;
pub mod sync;
pub mod uninstall;

pub use install::Installer;
pub use paths::Dirs;
pub use reporter::{NullReporter, Reporter};
pub use sync::Synchronizer;
pub use uninstall::Uninstaller;

/// User Agent string for API and download requests.
pub const USER_AGENT: &str = concat!("toolsync/", env!("CARGO_PKG_VERSION"));
