//! CPU architecture detection and release-asset matching patterns.

use serde::{Deserialize, Serialize};

/// The CPU architectures toolsync installs for.
///
/// Used to pick the right pre-compiled asset from a release listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// ARM64 (Apple Silicon).
    #[default]
    Arm64,
    /// `x86_64` (Intel).
    X86_64,
}

impl Arch {
    /// Get the current architecture.
    pub fn current() -> Self {
        #[cfg(target_arch = "aarch64")]
        {
            Self::Arm64
        }
        #[cfg(not(target_arch = "aarch64"))]
        {
            Self::X86_64
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::X86_64 => "x86_64",
        }
    }

    /// Asset filename substrings matching this architecture, most
    /// specific first. Selection walks this list in order and, within a
    /// pattern, takes the first asset in listing order.
    pub fn asset_patterns(&self) -> &'static [&'static str] {
        match self {
            Self::Arm64 => &[
                "darwin-arm64",
                "darwin_arm64",
                "darwin_aarch64",
                "aarch64-apple-darwin",
                "arm64",
                "macos",
            ],
            Self::X86_64 => &[
                "darwin-amd64",
                "darwin_amd64",
                "darwin_x86_64",
                "x86_64-apple-darwin",
                "amd64",
                "x86_64",
                "macos",
            ],
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arm64" | "aarch64" => Ok(Self::Arm64),
            "x86_64" | "amd64" => Ok(Self::X86_64),
            _ => Err(format!("Unknown architecture: {s}")),
        }
    }
}
