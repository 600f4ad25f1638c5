//! GitHub release metadata and asset selection.

use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::Deserialize;

use toolsync_schema::{Arch, ArchiveKind};

/// Default API base; tests inject a local server instead.
pub const GITHUB_API: &str = "https://api.github.com";

/// A validated GitHub repository reference in `owner/repo` format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubRepo(String);

impl GitHubRepo {
    /// Create a new `GitHubRepo`, validating the `owner/repo` format.
    ///
    /// # Errors
    ///
    /// Returns an error string if `s` is not in `owner/repo` format or if
    /// either component is empty.
    pub fn new(s: &str) -> Result<Self, String> {
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
                Ok(Self(s.to_string()))
            }
            _ => Err(format!(
                "invalid repository: expected 'owner/repo', got '{s}'"
            )),
        }
    }

    /// Return the raw `owner/repo` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GitHubRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A release as returned by the hosting API.
#[derive(Debug, Deserialize)]
pub struct Release {
    /// Release tag, e.g. `v1.0.0`.
    pub tag_name: String,
    /// Downloadable assets, in listing order.
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// A single downloadable asset of a release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    /// Asset filename.
    pub name: String,
    /// Direct download URL.
    pub browser_download_url: String,
}

/// Fetch release metadata for a tag, or the latest release when no tag
/// is given.
///
/// # Errors
///
/// Fails on transport errors, non-success HTTP status, and malformed
/// release JSON.
pub async fn fetch_release(
    client: &Client,
    api_base: &str,
    repo: &GitHubRepo,
    tag: Option<&str>,
) -> Result<Release> {
    let url = match tag {
        Some(tag) => format!("{api_base}/repos/{repo}/releases/tags/{tag}"),
        None => format!("{api_base}/repos/{repo}/releases/latest"),
    };
    tracing::debug!(%url, "fetching release metadata");

    let response = client
        .get(&url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await
        .with_context(|| format!("release fetch failed for {repo}"))?;

    let status = response.status();
    if !status.is_success() {
        bail!(
            "release fetch failed for {repo}{}: HTTP {status}",
            tag.map(|t| format!(" at tag {t}")).unwrap_or_default()
        );
    }

    response
        .json::<Release>()
        .await
        .with_context(|| format!("malformed release metadata for {repo}"))
}

/// Select the asset to download for `arch`.
///
/// Patterns are tried in priority order; within a pattern the first
/// asset in listing order wins. An asset must also carry a recognized
/// archive suffix to qualify.
pub fn select_asset(assets: &[ReleaseAsset], arch: Arch) -> Option<&ReleaseAsset> {
    for pattern in arch.asset_patterns() {
        for asset in assets {
            let name = asset.name.to_lowercase();
            if name.contains(pattern) && ArchiveKind::from_name(&name).is_some() {
                return Some(asset);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> ReleaseAsset {
        ReleaseAsset {
            name: name.to_string(),
            browser_download_url: format!("https://example.com/{name}"),
        }
    }

    #[test]
    fn test_repo_validation() {
        assert!(GitHubRepo::new("jqlang/jq").is_ok());
        assert!(GitHubRepo::new("jq").is_err());
        assert!(GitHubRepo::new("a/b/c").is_err());
        assert!(GitHubRepo::new("/jq").is_err());
    }

    #[test]
    fn test_select_prefers_earlier_pattern() {
        let assets = vec![
            asset("tool-1.0-macos.tar.gz"),
            asset("tool-1.0-darwin-arm64.tar.gz"),
        ];
        // "darwin-arm64" outranks "macos" even though it lists second.
        let chosen = select_asset(&assets, Arch::Arm64).unwrap();
        assert_eq!(chosen.name, "tool-1.0-darwin-arm64.tar.gz");
    }

    #[test]
    fn test_select_ties_break_by_listing_order() {
        let assets = vec![
            asset("tool-a-darwin-arm64.tar.gz"),
            asset("tool-b-darwin-arm64.tar.gz"),
        ];
        let chosen = select_asset(&assets, Arch::Arm64).unwrap();
        assert_eq!(chosen.name, "tool-a-darwin-arm64.tar.gz");
    }

    #[test]
    fn test_select_requires_archive_suffix() {
        let assets = vec![asset("tool-darwin-arm64.sha256"), asset("tool-darwin-arm64")];
        assert!(select_asset(&assets, Arch::Arm64).is_none());
    }

    #[test]
    fn test_select_none_for_foreign_platforms() {
        let assets = vec![asset("tool-windows-amd64.zip")];
        assert!(select_asset(&assets, Arch::Arm64).is_none());
    }
}
