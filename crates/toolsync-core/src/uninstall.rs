//! Source-aware tool removal.
//!
//! Removal dispatches on the source kind recorded at install time.
//! Records written before the source field existed fall back to
//! inferring the origin from the recorded install path, and every
//! removal gets the generic fallback chain (pkgutil forget, then a
//! privileged glob removal) before giving up.

use std::fs;
use std::path::Path;

use crate::paths::{Dirs, is_under};
use crate::process;
use crate::reporter::Reporter;
use toolsync_schema::{FontRecord, SourceKind, ToolRecord};

/// Removes tools that were dropped from the declaration.
pub struct Uninstaller<R> {
    reporter: R,
    dirs: Dirs,
}

impl<R: Reporter> Uninstaller<R> {
    /// Create an uninstaller over the given directories.
    pub fn new(reporter: R, dirs: Dirs) -> Self {
        Self { reporter, dirs }
    }

    /// Remove one tool. Returns `true` on success; on `false` the caller
    /// keeps the state record so the next run retries.
    pub async fn uninstall(&self, name: &str, record: &ToolRecord) -> bool {
        self.reporter.removing(name);

        let primary = match record.source {
            Some(kind) => self.remove_by_source(kind, name, record).await,
            None => self.remove_by_path_hint(name, record).await,
        };
        if primary {
            return true;
        }

        self.forget_package(name).await || self.remove_globbed(name).await
    }

    async fn remove_by_source(&self, kind: SourceKind, name: &str, record: &ToolRecord) -> bool {
        match kind {
            SourceKind::Homebrew => self.brew_uninstall(name).await,
            SourceKind::GoModule => self.remove_file(&record.install_path),
            SourceKind::RustupComponent => self.rustup_remove(name, record).await,
            SourceKind::GithubRelease | SourceKind::DirectUrl => {
                self.remove_recorded_path(record)
            }
        }
    }

    /// Legacy records carry no source; recognize the probable origin
    /// from where the binary sits. A manually placed binary sharing one
    /// of these prefixes can be misclassified - a known limitation of
    /// the inference.
    async fn remove_by_path_hint(&self, name: &str, record: &ToolRecord) -> bool {
        let path = &record.install_path;
        if is_under(path, &self.dirs.brew_bin) {
            return self.brew_uninstall(name).await;
        }
        if is_under(path, &self.dirs.go_bin) {
            return self.remove_file(path);
        }
        if is_under(path, &self.dirs.cargo_bin) {
            return self.rustup_remove(name, record).await;
        }
        self.remove_recorded_path(record)
    }

    async fn brew_uninstall(&self, name: &str) -> bool {
        match process::run("brew", &["uninstall", name]).await {
            Ok(out) if out.success => true,
            Ok(out) => {
                self.reporter
                    .error(&format!("brew uninstall {name} failed: {}", out.trimmed()));
                false
            }
            Err(err) => {
                self.reporter.error(&format!("{err:#}"));
                false
            }
        }
    }

    /// Rustup components cannot be removed from a system toolchain, and
    /// rustup itself offers no per-component removal for linked
    /// binaries, so the link is dropped directly with `cargo uninstall`
    /// as the fallback for non-component artifacts.
    async fn rustup_remove(&self, name: &str, record: &ToolRecord) -> bool {
        let shown = match process::run("rustup", &["show", "active-toolchain"]).await {
            Ok(out) if out.success => out,
            Ok(out) => {
                self.reporter.error(&format!(
                    "failed to query active rustup toolchain: {}",
                    out.trimmed()
                ));
                return false;
            }
            Err(err) => {
                self.reporter.error(&format!("{err:#}"));
                return false;
            }
        };

        let toolchain = shown.trimmed();
        if toolchain.contains("system") {
            self.reporter.warning(&format!(
                "refusing to remove '{name}': the active toolchain is the system toolchain; \
                 run `rustup install stable && rustup default stable` first"
            ));
            return false;
        }

        if self.remove_file(&record.install_path) {
            return true;
        }

        match process::run("cargo", &["uninstall", name]).await {
            Ok(out) if out.success => true,
            Ok(out) => {
                self.reporter
                    .error(&format!("cargo uninstall {name} failed: {}", out.trimmed()));
                false
            }
            Err(err) => {
                self.reporter.error(&format!("{err:#}"));
                false
            }
        }
    }

    /// Direct removal at the recorded path: file first, then a
    /// directory tree.
    fn remove_recorded_path(&self, record: &ToolRecord) -> bool {
        let path = &record.install_path;
        if path.as_os_str().is_empty() {
            return false;
        }
        if fs::remove_file(path).is_ok() {
            tracing::debug!(path = %path.display(), "removed file");
            return true;
        }
        if path.is_dir() && fs::remove_dir_all(path).is_ok() {
            tracing::debug!(path = %path.display(), "removed directory");
            return true;
        }
        false
    }

    fn remove_file(&self, path: &Path) -> bool {
        match fs::remove_file(path) {
            Ok(()) => true,
            Err(err) => {
                self.reporter
                    .error(&format!("failed to remove {}: {err}", path.display()));
                false
            }
        }
    }

    /// Query the platform package database and deregister the first
    /// entry containing the tool name.
    async fn forget_package(&self, name: &str) -> bool {
        let listed = match process::run("pkgutil", &["--pkgs"]).await {
            Ok(out) if out.success => out,
            _ => return false,
        };

        let Some(pkg) = listed.text.lines().find(|line| line.contains(name)) else {
            return false;
        };

        match process::run("sudo", &["pkgutil", "--forget", pkg.trim()]).await {
            Ok(out) if out.success => {
                self.reporter
                    .info(&format!("deregistered package {}", pkg.trim()));
                true
            }
            Ok(out) => {
                self.reporter
                    .error(&format!("pkgutil --forget {pkg} failed: {}", out.trimmed()));
                false
            }
            Err(_) => false,
        }
    }

    /// Last resort: glob the system bin dir for `{name}*` and force-
    /// remove every match. Succeeds when at least one file went away.
    async fn remove_globbed(&self, name: &str) -> bool {
        let pattern = format!("{}/{name}*", self.dirs.system_bin.display());
        let matches = match glob::glob(&pattern) {
            Ok(paths) => paths.flatten().collect::<Vec<_>>(),
            Err(err) => {
                self.reporter
                    .error(&format!("invalid glob pattern {pattern}: {err}"));
                return false;
            }
        };
        if matches.is_empty() {
            tracing::debug!(%pattern, "glob removal found no matches");
            return false;
        }

        let mut removed = false;
        for path in matches {
            let path_arg = path.to_string_lossy().into_owned();
            match process::run("sudo", &["rm", "-f", &path_arg]).await {
                Ok(out) if out.success => {
                    self.reporter.info(&format!("removed {path_arg}"));
                    removed = true;
                }
                Ok(out) => {
                    self.reporter
                        .error(&format!("failed to remove {path_arg}: {}", out.trimmed()));
                }
                Err(err) => {
                    self.reporter.error(&format!("{err:#}"));
                }
            }
        }
        removed
    }

    /// Remove an installed font: delete every recorded file, succeeding
    /// when at least one deletion succeeds.
    pub fn uninstall_font(&self, name: &str, record: &FontRecord) -> bool {
        let mut removed = false;
        for file in &record.files {
            match fs::remove_file(file) {
                Ok(()) => {
                    self.reporter
                        .info(&format!("removed font file {}", file.display()));
                    removed = true;
                }
                Err(err) => {
                    self.reporter.error(&format!(
                        "failed to remove font file {}: {err}",
                        file.display()
                    ));
                }
            }
        }
        if !removed {
            self.reporter
                .warning(&format!("no font files removed for {name}"));
        }
        removed
    }
}
