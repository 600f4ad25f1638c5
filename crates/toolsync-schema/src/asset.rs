//! Archive format recognition from asset filenames.
//!
//! Vendors are inconsistent about suffixes (`.tgz` vs `.tar.gz`), so the
//! parsing here is deliberately tolerant of the common spellings.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Archive container recognized by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveKind {
    /// Zip archive (`.zip`).
    Zip,
    /// 7-Zip archive (`.7z`).
    SevenZ,
    /// Uncompressed tar (`.tar`).
    Tar,
    /// Gzip-compressed tar (`.tar.gz`, `.tgz`).
    TarGz,
    /// Bzip2-compressed tar (`.tar.bz2`, `.tbz2`).
    TarBz2,
    /// XZ-compressed tar (`.tar.xz`, `.txz`).
    TarXz,
}

/// Recognized suffixes, longest first so that `.tar.gz` wins over `.gz`
/// style confusion when stripping.
const SUFFIXES: &[(&str, ArchiveKind)] = &[
    (".tar.gz", ArchiveKind::TarGz),
    (".tar.bz2", ArchiveKind::TarBz2),
    (".tar.xz", ArchiveKind::TarXz),
    (".tgz", ArchiveKind::TarGz),
    (".tbz2", ArchiveKind::TarBz2),
    (".txz", ArchiveKind::TarXz),
    (".tar", ArchiveKind::Tar),
    (".zip", ArchiveKind::Zip),
    (".7z", ArchiveKind::SevenZ),
];

impl ArchiveKind {
    /// Recognize an archive format from a filename, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        SUFFIXES
            .iter()
            .find(|(suffix, _)| lower.ends_with(suffix))
            .map(|(_, kind)| *kind)
    }

    /// Recognize an archive format from a path's file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(Self::from_name)
    }

    /// Strip a recognized archive suffix from a filename, returning the
    /// input unchanged when no suffix matches.
    pub fn strip_suffix(name: &str) -> &str {
        let lower = name.to_lowercase();
        for (suffix, _) in SUFFIXES {
            if lower.ends_with(suffix) {
                return &name[..name.len() - suffix.len()];
            }
        }
        name
    }
}

/// Infer a likely tool name from an archive filename: strip the archive
/// suffix, split on `-`/`_`, take the first non-empty segment.
///
/// `ripgrep-14.1.0-aarch64-apple-darwin.tar.gz` becomes `ripgrep`; the
/// result biases executable discovery toward files sharing that prefix.
pub fn infer_tool_name(file_name: &str) -> &str {
    let stem = ArchiveKind::strip_suffix(file_name);
    stem.split(['-', '_'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_recognition() {
        assert_eq!(ArchiveKind::from_name("a.tar.gz"), Some(ArchiveKind::TarGz));
        assert_eq!(ArchiveKind::from_name("a.TGZ"), Some(ArchiveKind::TarGz));
        assert_eq!(ArchiveKind::from_name("a.tar.bz2"), Some(ArchiveKind::TarBz2));
        assert_eq!(ArchiveKind::from_name("a.tar.xz"), Some(ArchiveKind::TarXz));
        assert_eq!(ArchiveKind::from_name("a.zip"), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_name("a.7z"), Some(ArchiveKind::SevenZ));
        assert_eq!(ArchiveKind::from_name("a.tar"), Some(ArchiveKind::Tar));
        assert_eq!(ArchiveKind::from_name("a.dmg"), None);
        assert_eq!(ArchiveKind::from_name("binary"), None);
    }

    #[test]
    fn test_strip_suffix() {
        assert_eq!(ArchiveKind::strip_suffix("jq-1.7.1.tar.gz"), "jq-1.7.1");
        assert_eq!(ArchiveKind::strip_suffix("tool.zip"), "tool");
        assert_eq!(ArchiveKind::strip_suffix("plain"), "plain");
    }

    #[test]
    fn test_infer_tool_name() {
        assert_eq!(
            infer_tool_name("ripgrep-14.1.0-aarch64-apple-darwin.tar.gz"),
            "ripgrep"
        );
        assert_eq!(infer_tool_name("fd_v8.7.0_macos.zip"), "fd");
        assert_eq!(infer_tool_name("-leading-dash.tar.gz"), "leading");
        assert_eq!(infer_tool_name("single.7z"), "single");
    }
}
