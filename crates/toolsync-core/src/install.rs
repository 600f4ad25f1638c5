//! Per-source install strategies.
//!
//! One strategy per [`SourceKind`]; every external failure becomes an
//! error carrying a specific cause, and an unknown source kind degrades
//! to a reported warning. Nothing here mutates shared state - the
//! synchronizer owns the state store.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::Client;
use tokio::process::Command;

use crate::io::download::download_file;
use crate::io::extract;
use crate::paths::{Dirs, filename_from_url};
use crate::process;
use crate::release::{self, GitHubRepo};
use crate::reporter::Reporter;
use toolsync_schema::{Arch, ArchiveKind, SourceKind, ToolSpec};

/// Installs tools according to their declared source.
pub struct Installer<R> {
    client: Client,
    reporter: R,
    dirs: Dirs,
    api_base: String,
}

impl<R: Reporter + Clone + Send + Sync + 'static> Installer<R> {
    /// Create an installer with the default release API endpoint.
    pub fn new(reporter: R, dirs: Dirs) -> Self {
        Self {
            client: Client::new(),
            reporter,
            dirs,
            api_base: release::GITHUB_API.to_string(),
        }
    }

    /// Override the release API base URL (tests point this at a local
    /// server).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// The directories this installer writes to.
    pub fn dirs(&self) -> &Dirs {
        &self.dirs
    }

    /// Install one tool.
    ///
    /// Returns `Ok(Some(path))` on success, `Ok(None)` when the source
    /// kind is unknown (reported as a warning, never an error).
    ///
    /// # Errors
    ///
    /// Any network, archive, filesystem, or subprocess failure, with a
    /// message naming the failing asset, path, or command.
    pub async fn install(&self, spec: &ToolSpec) -> Result<Option<PathBuf>> {
        let kind = match spec.source_kind() {
            Ok(kind) => kind,
            Err(_) => {
                self.reporter.warning(&format!(
                    "unknown source '{}' for {}, skipping",
                    spec.source, spec.name
                ));
                return Ok(None);
            }
        };

        let path = match kind {
            SourceKind::GithubRelease => self.install_release_archive(spec).await?,
            SourceKind::DirectUrl => self.install_direct_url(spec).await?,
            SourceKind::Homebrew => self.install_homebrew(spec).await?,
            SourceKind::GoModule => self.install_go_module(spec).await?,
            SourceKind::RustupComponent => self.install_rustup_component(spec).await?,
        };
        Ok(Some(path))
    }

    /// Fetch release metadata, pick the asset for this machine, download
    /// it, and hand it to the extractor.
    async fn install_release_archive(&self, spec: &ToolSpec) -> Result<PathBuf> {
        let repo = GitHubRepo::new(spec.repo.as_deref().unwrap_or(&spec.name))
            .map_err(|e| anyhow!("{}: {e}", spec.name))?;

        let pinned_tag;
        let tag = match &spec.tag {
            Some(tag) => Some(tag.as_str()),
            None if spec.wants_latest() => None,
            None => {
                pinned_tag = format!("v{}", spec.version);
                Some(pinned_tag.as_str())
            }
        };

        let release = release::fetch_release(&self.client, &self.api_base, &repo, tag).await?;

        let arch = Arch::current();
        let asset = release::select_asset(&release.assets, arch).ok_or_else(|| {
            anyhow!(
                "no asset in {repo} {} matches {arch} patterns [{}] with a recognized \
                 archive suffix ({} assets listed)",
                release.tag_name,
                arch.asset_patterns().join(", "),
                release.assets.len()
            )
        })?;
        tracing::debug!(asset = %asset.name, "selected release asset");

        let work = tempfile::Builder::new().prefix("toolsync-").tempdir()?;
        let archive_path = work.path().join(&asset.name);
        download_file(&self.client, &asset.browser_download_url, &archive_path)
            .await
            .with_context(|| format!("failed to download asset {}", asset.name))?;

        self.extract_blocking(archive_path, work.path().to_path_buf())
            .await
    }

    /// Download a URL verbatim: installer packages run through the
    /// privileged installer, archives through the extractor, anything
    /// else is the binary itself.
    async fn install_direct_url(&self, spec: &ToolSpec) -> Result<PathBuf> {
        let url = spec
            .url
            .as_deref()
            .ok_or_else(|| anyhow!("{} uses source 'direct-url' but has no url", spec.name))?;

        let remote_name = filename_from_url(url);
        let file_name = if remote_name.is_empty() {
            spec.name.as_str()
        } else {
            remote_name
        };

        let work = tempfile::Builder::new().prefix("toolsync-").tempdir()?;
        let downloaded = work.path().join(file_name);
        download_file(&self.client, url, &downloaded)
            .await
            .with_context(|| format!("failed to download {url}"))?;

        if file_name.ends_with(".pkg") {
            let path_arg = downloaded.to_string_lossy().into_owned();
            let out = process::run("sudo", &["installer", "-pkg", &path_arg, "-target", "/"])
                .await?;
            if !out.success {
                bail!("installer failed for {}: {}", file_name, out.trimmed());
            }
            // Installer packages do not reveal their targets; report the
            // conventional application root.
            return Ok(PathBuf::from("/Applications"));
        }

        if ArchiveKind::from_name(file_name).is_some() {
            return self
                .extract_blocking(downloaded, work.path().to_path_buf())
                .await;
        }

        extract::install_executable(&downloaded, &spec.name, &self.dirs)
            .map_err(|e| anyhow!("installing {} failed: {e}", spec.name))
    }

    /// `brew install`, pinned to this machine's silicon.
    async fn install_homebrew(&self, spec: &ToolSpec) -> Result<PathBuf> {
        let cmd = if Arch::current() == Arch::Arm64 {
            let mut c = Command::new("arch");
            c.args(["-arm64", "brew", "install", &spec.name]);
            c
        } else {
            let mut c = Command::new("brew");
            c.args(["install", &spec.name]);
            c
        };

        let out = process::run_command(cmd, "brew install").await?;
        if !out.success {
            bail!("brew install {} failed: {}", spec.name, out.trimmed());
        }

        // Homebrew links formulae into its bin dir by convention; no
        // filesystem probing.
        Ok(self.dirs.brew_bin.join(&spec.name))
    }

    /// `go install module@version` with GOBIN pointed at the Go bin dir.
    async fn install_go_module(&self, spec: &ToolSpec) -> Result<PathBuf> {
        let module = spec.repo.as_deref().unwrap_or(&spec.name);
        let target = if spec.wants_latest() {
            format!("{module}@latest")
        } else {
            format!("{module}@v{}", spec.version)
        };

        let mut cmd = Command::new("go");
        cmd.args(["install", &target]);
        cmd.env("GOBIN", &self.dirs.go_bin);

        let out = process::run_command(cmd, "go install").await?;
        if !out.success {
            bail!("go install {target} failed: {}", out.trimmed());
        }

        Ok(self.dirs.go_bin.join(&spec.name))
    }

    /// `rustup component add`, then link the component binary from the
    /// active toolchain into the cargo bin dir.
    async fn install_rustup_component(&self, spec: &ToolSpec) -> Result<PathBuf> {
        let name = spec.name.as_str();

        let out = process::run("rustup", &["component", "add", name]).await?;
        if !out.success {
            if out.text.contains("does not support components")
                || out.text.contains("not a component")
            {
                bail!(
                    "rustup reports '{name}' is not an installable component for the \
                     active toolchain: {}",
                    out.trimmed()
                );
            }
            bail!("rustup component add {name} failed: {}", out.trimmed());
        }

        let shown = process::run("rustup", &["show", "active-toolchain"]).await?;
        if !shown.success {
            bail!("failed to query active rustup toolchain: {}", shown.trimmed());
        }
        let toolchain = shown
            .text
            .split_whitespace()
            .next()
            .ok_or_else(|| anyhow!("rustup returned an empty active toolchain"))?;

        let real = self.dirs.toolchain_bin(toolchain, name);
        if !real.exists() {
            bail!(
                "component '{name}' was added but its binary is missing at {}",
                real.display()
            );
        }

        let link = self.dirs.cargo_bin.join(name);
        if link.symlink_metadata().is_ok() {
            std::fs::remove_file(&link)
                .with_context(|| format!("cannot replace existing link {}", link.display()))?;
        }
        std::os::unix::fs::symlink(&real, &link)
            .with_context(|| format!("cannot link {} -> {}", link.display(), real.display()))?;

        Ok(link)
    }

    /// Run the blocking extractor off the async runtime.
    async fn extract_blocking(&self, archive: PathBuf, work_dir: PathBuf) -> Result<PathBuf> {
        let dirs = self.dirs.clone();
        let installed = tokio::task::spawn_blocking(move || {
            extract::extract_and_install(&archive, &work_dir, &dirs)
        })
        .await??;
        Ok(installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::NullReporter;
    use std::path::Path;

    fn test_dirs(base: &Path) -> Dirs {
        Dirs {
            system_bin: base.join("sysbin"),
            user_bin: base.join("userbin"),
            brew_bin: base.join("brew"),
            go_bin: base.join("go"),
            cargo_bin: base.join("cargo"),
            rustup_home: base.join("rustup"),
            fonts: base.join("fonts"),
        }
    }

    fn spec(name: &str, version: &str, source: &str) -> ToolSpec {
        ToolSpec {
            name: name.into(),
            version: version.into(),
            source: source.into(),
            repo: None,
            tag: None,
            url: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_source_is_skipped_not_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let installer = Installer::new(NullReporter, test_dirs(tmp.path()));
        let result = installer
            .install(&spec("mystery", "1.0", "npm"))
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_release_archive_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = test_dirs(tmp.path());
        std::fs::create_dir_all(&dirs.system_bin).unwrap();

        // Build the asset the mock release will serve.
        let archive = tmp.path().join("demo-1.2.0-darwin-arm64.tar.gz");
        {
            let file = std::fs::File::create(&archive).unwrap();
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            let data = b"#!/bin/sh\necho demo\n";
            let mut header = tar::Header::new_gnu();
            header.set_path("demo-1.2.0/demo").unwrap();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append(&header, &data[..]).unwrap();
            builder.finish().unwrap();
        }
        let bytes = std::fs::read(&archive).unwrap();

        let mut server = mockito::Server::new_async().await;
        // A foreign-platform decoy listed first, then one asset per
        // darwin arch so the test passes on either host.
        let release_json = serde_json::json!({
            "tag_name": "v1.2.0",
            "assets": [
                {
                    "name": "demo-1.2.0-linux-riscv64.tar.gz",
                    "browser_download_url": format!("{}/dl/riscv.tar.gz", server.url()),
                },
                {
                    "name": "demo-1.2.0-darwin-arm64.tar.gz",
                    "browser_download_url": format!("{}/dl/demo.tar.gz", server.url()),
                },
                {
                    "name": "demo-1.2.0-darwin-amd64.tar.gz",
                    "browser_download_url": format!("{}/dl/demo.tar.gz", server.url()),
                },
            ],
        });
        server
            .mock("GET", "/repos/acme/demo/releases/tags/v1.2.0")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(release_json.to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/dl/demo.tar.gz")
            .with_status(200)
            .with_body(bytes)
            .create_async()
            .await;

        let installer = Installer::new(NullReporter, dirs.clone()).with_api_base(server.url());
        let mut tool = spec("demo", "1.2.0", "github-release");
        tool.repo = Some("acme/demo".into());

        let installed = installer.install(&tool).await.unwrap();
        assert_eq!(installed, Some(dirs.system_bin.join("demo")));
    }

    #[tokio::test]
    async fn test_release_archive_no_matching_asset_is_descriptive() {
        let mut server = mockito::Server::new_async().await;
        let release_json = serde_json::json!({
            "tag_name": "v2.0.0",
            "assets": [
                { "name": "demo-2.0.0-linux-riscv64.tar.gz",
                  "browser_download_url": "https://example.com/x" },
            ],
        });
        server
            .mock("GET", "/repos/acme/demo/releases/tags/v2.0.0")
            .with_status(200)
            .with_body(release_json.to_string())
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let installer =
            Installer::new(NullReporter, test_dirs(tmp.path())).with_api_base(server.url());
        let mut tool = spec("demo", "2.0.0", "github");
        tool.repo = Some("acme/demo".into());

        let err = installer.install(&tool).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("no asset"));
        assert!(msg.contains("acme/demo"));
    }

    #[tokio::test]
    async fn test_release_fetch_http_error_names_repo_and_tag() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/acme/demo/releases/tags/v9.9.9")
            .with_status(404)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let installer =
            Installer::new(NullReporter, test_dirs(tmp.path())).with_api_base(server.url());
        let mut tool = spec("demo", "9.9.9", "github");
        tool.repo = Some("acme/demo".into());

        let err = installer.install(&tool).await.unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("acme/demo"));
        assert!(msg.contains("404"));
    }

    #[tokio::test]
    async fn test_direct_url_raw_binary() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/bin/hello")
            .with_status(200)
            .with_body(b"#!/bin/sh\necho hello\n".to_vec())
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let dirs = test_dirs(tmp.path());
        std::fs::create_dir_all(&dirs.system_bin).unwrap();

        let installer = Installer::new(NullReporter, dirs.clone());
        let mut tool = spec("hello", "1.0.0", "direct-url");
        tool.url = Some(format!("{}/bin/hello", server.url()));

        let installed = installer.install(&tool).await.unwrap().unwrap();
        assert_eq!(installed, dirs.system_bin.join("hello"));
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&installed).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);
    }

    #[tokio::test]
    async fn test_direct_url_without_url_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let installer = Installer::new(NullReporter, test_dirs(tmp.path()));
        let err = installer
            .install(&spec("nourl", "1.0", "url"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no url"));
    }

    #[tokio::test]
    async fn test_release_repo_must_be_owner_slash_name() {
        let tmp = tempfile::tempdir().unwrap();
        let installer = Installer::new(NullReporter, test_dirs(tmp.path()));
        // No repo override and a bare name is not owner/repo.
        let err = installer
            .install(&spec("demo", "1.0.0", "github"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("owner/repo"));
    }
}
