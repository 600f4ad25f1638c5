//! Font synchronization.
//!
//! Fonts ride the same release-download-extract path as tools, with a
//! font-file filter instead of executable discovery: every `.ttf`/`.otf`
//! in the extracted tree is copied into the user font directory.

use std::path::PathBuf;

use reqwest::Client;
use walkdir::WalkDir;

use crate::io::download::download_file;
use crate::io::extract::extract_archive;
use crate::paths::Dirs;
use crate::release::{self, GitHubRepo};
use crate::reporter::Reporter;
use crate::uninstall::Uninstaller;
use toolsync_schema::{ArchiveKind, FontRecord, FontSpec, StateStore};

/// Installs and removes fonts declared in the configuration.
pub struct FontSync<R> {
    client: Client,
    api_base: String,
    reporter: R,
    dirs: Dirs,
    uninstaller: Uninstaller<R>,
}

impl<R: Reporter + Clone + Send + Sync + 'static> FontSync<R> {
    /// Create a font synchronizer over the given directories.
    pub fn new(reporter: R, dirs: Dirs) -> Self {
        Self {
            client: Client::new(),
            api_base: release::GITHUB_API.to_string(),
            uninstaller: Uninstaller::new(reporter.clone(), dirs.clone()),
            reporter,
            dirs,
        }
    }

    /// Override the release API base URL (tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Install declared fonts that are not yet recorded and remove
    /// recorded fonts that were dropped from the declaration.
    pub async fn sync(&self, desired: &[FontSpec], state: &mut StateStore) {
        for font in desired {
            if state.fonts.contains_key(&font.name) {
                self.reporter
                    .info(&format!("font {} already installed, skipping", font.name));
                continue;
            }
            match self.install_font(font).await {
                Ok(record) => {
                    self.reporter
                        .done(&font.name, &format!("{} font files", record.files.len()));
                    state.fonts.insert(font.name.clone(), record);
                }
                Err(err) => self.reporter.failed(&font.name, &format!("{err:#}")),
            }
        }

        let stale: Vec<String> = state
            .fonts
            .keys()
            .filter(|name| !desired.iter().any(|f| &f.name == *name))
            .cloned()
            .collect();
        for name in stale {
            let Some(record) = state.fonts.get(&name).cloned() else {
                continue;
            };
            self.reporter
                .warning(&format!("font {name} removed from config, uninstalling"));
            if self.uninstaller.uninstall_font(&name, &record) {
                state.fonts.remove(&name);
            }
        }
    }

    async fn install_font(&self, font: &FontSpec) -> anyhow::Result<FontRecord> {
        let repo = GitHubRepo::new(&font.repo).map_err(|e| anyhow::anyhow!(e))?;
        let release =
            release::fetch_release(&self.client, &self.api_base, &repo, font.tag.as_deref())
                .await?;

        // Font archives are arch-neutral: the first archive asset wins.
        let asset = release
            .assets
            .iter()
            .find(|a| ArchiveKind::from_name(&a.name).is_some())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "no archive asset in {repo} {} ({} assets listed)",
                    release.tag_name,
                    release.assets.len()
                )
            })?;

        let work = tempfile::Builder::new().prefix("toolsync-font-").tempdir()?;
        let archive_path = work.path().join(&asset.name);
        download_file(&self.client, &asset.browser_download_url, &archive_path).await?;

        let scratch = work.path().join("extracted");
        let font_dir = self.dirs.fonts.clone();
        let url = asset.browser_download_url.clone();
        let name = font.name.clone();

        let files = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<PathBuf>> {
            let tree = extract_archive(&archive_path, &scratch)?;
            let mut installed = Vec::new();
            std::fs::create_dir_all(&font_dir)?;
            for entry in WalkDir::new(&tree.root).sort_by_file_name() {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let file_name = entry.file_name().to_string_lossy().to_lowercase();
                if !file_name.ends_with(".ttf") && !file_name.ends_with(".otf") {
                    continue;
                }
                let dest = font_dir.join(entry.file_name());
                std::fs::copy(entry.path(), &dest)?;
                installed.push(dest);
            }
            if installed.is_empty() {
                anyhow::bail!("no font files found in archive for {name}");
            }
            Ok(installed)
        })
        .await??;

        Ok(FontRecord {
            name: font.name.clone(),
            url,
            files,
        })
    }
}
