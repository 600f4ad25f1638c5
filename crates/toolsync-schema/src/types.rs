//! Tool declarations and persisted state records.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How a tool gets onto the machine.
///
/// The configuration carries the source as a free-form string so that an
/// unrecognized value degrades to a reported warning instead of a parse
/// failure; [`ToolSpec::source_kind`] performs the actual resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Download a release archive from the GitHub releases API.
    #[serde(alias = "github")]
    GithubRelease,
    /// Download a single URL verbatim (archive, raw binary, or .pkg).
    #[serde(alias = "url")]
    DirectUrl,
    /// Install through Homebrew.
    #[serde(alias = "brew")]
    Homebrew,
    /// Install with `go install` into the Go bin directory.
    #[serde(alias = "go")]
    GoModule,
    /// Add a rustup component and link it into the cargo bin directory.
    #[serde(alias = "rustup")]
    RustupComponent,
}

impl SourceKind {
    /// Canonical kebab-case name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GithubRelease => "github-release",
            Self::DirectUrl => "direct-url",
            Self::Homebrew => "homebrew",
            Self::GoModule => "go-module",
            Self::RustupComponent => "rustup-component",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github-release" | "github" => Ok(Self::GithubRelease),
            "direct-url" | "url" => Ok(Self::DirectUrl),
            "homebrew" | "brew" => Ok(Self::Homebrew),
            "go-module" | "go" => Ok(Self::GoModule),
            "rustup-component" | "rustup" => Ok(Self::RustupComponent),
            _ => Err(format!("unknown install source: {s}")),
        }
    }
}

/// A single declared tool from the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Logical tool name; also the state key.
    pub name: String,
    /// Desired version. Empty (or `"latest"`) means whatever the source
    /// considers current.
    #[serde(default)]
    pub version: String,
    /// Install source, resolved lazily via [`ToolSpec::source_kind`].
    pub source: String,
    /// Repository override for release and module sources
    /// (e.g. `"BurntSushi/ripgrep"` or a Go module path).
    #[serde(default)]
    pub repo: Option<String>,
    /// Release tag override when it differs from `v{version}`.
    #[serde(default)]
    pub tag: Option<String>,
    /// Download URL for the `direct-url` source.
    #[serde(default)]
    pub url: Option<String>,
}

impl ToolSpec {
    /// Resolve the source string to a known kind.
    ///
    /// # Errors
    ///
    /// Returns the unrecognized source string; callers report it as a
    /// warning and skip the tool.
    pub fn source_kind(&self) -> Result<SourceKind, String> {
        self.source.parse()
    }

    /// True when no concrete version was pinned.
    pub fn wants_latest(&self) -> bool {
        self.version.is_empty() || self.version == "latest"
    }
}

/// Persisted record of an installed tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRecord {
    /// Version string recorded at install time (desired version verbatim).
    pub version: String,
    /// Absolute path of the installed executable (or install root).
    pub install_path: PathBuf,
    /// True when toolsync installed this tool, false for pre-existing
    /// installs it merely observed.
    #[serde(default)]
    pub managed: bool,
    /// Source the tool was installed from. Records written by older
    /// versions lack this; removal then falls back to path inference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceKind>,
}

/// A macOS `defaults` preference to apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    /// Preference domain, e.g. `com.apple.finder`.
    pub domain: String,
    /// Key inside the domain.
    pub key: String,
    /// Value, always carried as a string.
    pub value: String,
    /// Value type: `bool`, `int`, `float`, or anything else for string.
    #[serde(default, rename = "type")]
    pub value_type: String,
}

impl Setting {
    /// Unique state key for this setting.
    pub fn state_key(&self) -> String {
        format!("{}:{}", self.domain, self.key)
    }
}

/// Persisted record of an applied setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingRecord {
    /// Preference domain.
    pub domain: String,
    /// Key inside the domain.
    pub key: String,
    /// Value last written.
    pub value: String,
}

/// Shell alias configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AliasConfig {
    /// Target shell (`zsh` or `bash`); detected from `$SHELL` when unset.
    #[serde(default)]
    pub shell: Option<String>,
    /// Raw lines appended to the rc file verbatim.
    #[serde(default)]
    pub raw_configs: Vec<String>,
    /// Alias entries.
    #[serde(default)]
    pub entries: Vec<Alias>,
}

/// A single shell alias.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alias {
    /// Alias name, e.g. `gs`.
    pub name: String,
    /// Alias expansion, e.g. `git status`.
    pub value: String,
}

/// A font to install from a GitHub release archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontSpec {
    /// Font family name; also the state key.
    pub name: String,
    /// GitHub repository in `owner/repo` form.
    pub repo: String,
    /// Release tag; latest release when unset.
    #[serde(default)]
    pub tag: Option<String>,
}

/// Persisted record of an installed font.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontRecord {
    /// Font family name.
    pub name: String,
    /// Download URL used.
    pub url: String,
    /// Installed font file paths.
    pub files: Vec<PathBuf>,
}

/// The full persisted state, keyed by resource name.
///
/// All maps default to empty: a missing or unreadable state file loads as
/// a fresh store, never as an error or a nil map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateStore {
    /// Installed tools by name.
    #[serde(default)]
    pub tools: BTreeMap<String, ToolRecord>,
    /// Applied settings by `domain:key`.
    #[serde(default)]
    pub settings: BTreeMap<String, SettingRecord>,
    /// Installed fonts by name.
    #[serde(default)]
    pub fonts: BTreeMap<String, FontRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_parsing() {
        assert_eq!(
            "github-release".parse::<SourceKind>(),
            Ok(SourceKind::GithubRelease)
        );
        assert_eq!("github".parse::<SourceKind>(), Ok(SourceKind::GithubRelease));
        assert_eq!("brew".parse::<SourceKind>(), Ok(SourceKind::Homebrew));
        assert_eq!("GO".parse::<SourceKind>(), Ok(SourceKind::GoModule));
        assert!("npm".parse::<SourceKind>().is_err());
    }

    #[test]
    fn test_wants_latest() {
        let mut spec = ToolSpec {
            name: "jq".into(),
            version: String::new(),
            source: "github".into(),
            repo: None,
            tag: None,
            url: None,
        };
        assert!(spec.wants_latest());
        spec.version = "latest".into();
        assert!(spec.wants_latest());
        spec.version = "1.7.1".into();
        assert!(!spec.wants_latest());
    }

    #[test]
    fn test_state_store_missing_sections_default_empty() {
        let state: StateStore = serde_json::from_str("{}").unwrap();
        assert!(state.tools.is_empty());
        assert!(state.settings.is_empty());
        assert!(state.fonts.is_empty());
    }

    #[test]
    fn test_tool_record_without_source_round_trips() {
        let json = r#"{"version":"1.0.0","install_path":"/usr/local/bin/foo","managed":true}"#;
        let record: ToolRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.source, None);
        let out = serde_json::to_string(&record).unwrap();
        assert!(!out.contains("source"));
    }
}
