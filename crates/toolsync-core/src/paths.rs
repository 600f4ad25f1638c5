//! Filesystem roots the engine reads and writes.

use dirs::home_dir;
use std::path::{Path, PathBuf};

/// Every directory the install and uninstall strategies touch.
///
/// Built once per run and passed explicitly, so tests can point the
/// engine at temp directories instead of the live system.
#[derive(Debug, Clone)]
pub struct Dirs {
    /// System-wide binary directory, tried first for installs.
    pub system_bin: PathBuf,
    /// Per-user fallback binary directory, created on demand.
    pub user_bin: PathBuf,
    /// Homebrew's binary directory.
    pub brew_bin: PathBuf,
    /// Go's install target (`GOBIN`).
    pub go_bin: PathBuf,
    /// Cargo's binary directory, where rustup component links live.
    pub cargo_bin: PathBuf,
    /// Rustup home containing `toolchains/<name>/bin`.
    pub rustup_home: PathBuf,
    /// User font directory.
    pub fonts: PathBuf,
}

impl Dirs {
    /// Standard locations, or `None` if the user's home cannot be resolved.
    pub fn try_standard() -> Option<Self> {
        let home = home_dir()?;
        Some(Self {
            system_bin: PathBuf::from("/usr/local/bin"),
            user_bin: home.join("bin"),
            brew_bin: PathBuf::from("/opt/homebrew/bin"),
            go_bin: home.join("go/bin"),
            cargo_bin: home.join(".cargo/bin"),
            rustup_home: home.join(".rustup"),
            fonts: home.join("Library/Fonts"),
        })
    }

    /// Standard locations.
    ///
    /// # Panics
    ///
    /// Panics if the user's home directory cannot be resolved, which does
    /// not happen in normal interactive use.
    pub fn standard() -> Self {
        Self::try_standard().expect("could not determine home directory")
    }

    /// The binary path a rustup component resolves to inside a toolchain.
    pub fn toolchain_bin(&self, toolchain: &str, name: &str) -> PathBuf {
        self.rustup_home
            .join("toolchains")
            .join(toolchain)
            .join("bin")
            .join(name)
    }
}

/// Extract the filename from a URL.
pub fn filename_from_url(url: &str) -> &str {
    url.split('/').next_back().unwrap_or("")
}

/// True when `path` sits underneath `root`.
pub fn is_under(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}
