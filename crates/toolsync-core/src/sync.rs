//! The reconciliation loop.
//!
//! Compares the declared tool list against the persisted state, runs
//! install attempts for missing or version-drifted tools as concurrent
//! tasks, then sequentially removes tools that were dropped from the
//! declaration. The tool map is the only shared mutable resource during
//! the concurrent phase; its lock is held per map operation, never
//! across download or extraction work.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;

use crate::install::Installer;
use crate::paths::Dirs;
use crate::reporter::Reporter;
use crate::uninstall::Uninstaller;
use toolsync_schema::{StateStore, ToolRecord, ToolSpec};

enum InstallOutcome {
    Installed,
    Skipped,
    Failed,
}

/// Drives a full reconciliation pass.
pub struct Synchronizer<R> {
    installer: Arc<Installer<R>>,
    uninstaller: Uninstaller<R>,
    reporter: R,
}

impl<R: Reporter + Clone + Send + Sync + 'static> Synchronizer<R> {
    /// Create a synchronizer over the standard directories.
    pub fn new(reporter: R, dirs: Dirs) -> Self {
        Self::from_parts(
            Installer::new(reporter.clone(), dirs.clone()),
            Uninstaller::new(reporter.clone(), dirs),
            reporter,
        )
    }

    /// Assemble from pre-built components (tests inject an installer
    /// with a local API endpoint).
    pub fn from_parts(installer: Installer<R>, uninstaller: Uninstaller<R>, reporter: R) -> Self {
        Self {
            installer: Arc::new(installer),
            uninstaller,
            reporter,
        }
    }

    /// Reconcile the machine with the declared tool list.
    ///
    /// Installs run concurrently; removals run sequentially afterwards.
    /// Per-tool failures are reported and leave that tool's state entry
    /// unchanged - they never abort the pass for other tools.
    pub async fn reconcile(&self, desired: &[ToolSpec], state: &mut StateStore) {
        tracing::debug!(
            desired = desired.len(),
            recorded = state.tools.len(),
            "starting tool reconciliation"
        );

        let desired_names: HashSet<&str> = desired.iter().map(|t| t.name.as_str()).collect();

        // The tool map moves behind a mutex for the concurrent phase.
        let tools = Arc::new(Mutex::new(std::mem::take(&mut state.tools)));
        let mut tasks: JoinSet<InstallOutcome> = JoinSet::new();
        let mut installed = 0usize;
        let mut failed = 0usize;

        for spec in desired.iter().cloned() {
            // Snapshot read: each tool's current record is read once,
            // before its task is spawned.
            let current = {
                let tools = tools.lock().expect("state lock poisoned");
                tools.get(&spec.name).map(|r| r.version.clone())
            };

            if current.as_deref() == Some(spec.version.as_str()) {
                self.reporter.info(&format!(
                    "{} {} is current, skipping",
                    spec.name,
                    display_version(&spec.version)
                ));
                continue;
            }

            let installer = Arc::clone(&self.installer);
            let reporter = self.reporter.clone();
            let tools = Arc::clone(&tools);

            tasks.spawn(async move {
                reporter.installing(&spec.name, display_version(&spec.version));
                match installer.install(&spec).await {
                    Ok(Some(install_path)) => {
                        let record = ToolRecord {
                            version: spec.version.clone(),
                            install_path: install_path.clone(),
                            managed: true,
                            source: spec.source_kind().ok(),
                        };
                        {
                            let mut tools = tools.lock().expect("state lock poisoned");
                            tools.insert(spec.name.clone(), record);
                        }
                        reporter.done(
                            &spec.name,
                            &format!("installed to {}", install_path.display()),
                        );
                        InstallOutcome::Installed
                    }
                    Ok(None) => InstallOutcome::Skipped,
                    Err(err) => {
                        reporter.failed(&spec.name, &format!("{err:#}"));
                        InstallOutcome::Failed
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(InstallOutcome::Installed) => installed += 1,
                Ok(InstallOutcome::Skipped) => {}
                Ok(InstallOutcome::Failed) => failed += 1,
                Err(err) => {
                    self.reporter.error(&format!("install task aborted: {err}"));
                    failed += 1;
                }
            }
        }

        // All tasks joined; the map is uniquely owned again.
        state.tools = Arc::try_unwrap(tools)
            .expect("install tasks still hold the state map")
            .into_inner()
            .expect("state lock poisoned");

        // Sequential removal, so the map is never structurally mutated
        // while a concurrent task could observe it.
        let stale: Vec<String> = state
            .tools
            .keys()
            .filter(|name| !desired_names.contains(name.as_str()))
            .cloned()
            .collect();

        let mut removed = 0usize;
        for name in stale {
            let Some(record) = state.tools.get(&name).cloned() else {
                continue;
            };
            self.reporter
                .warning(&format!("{name} removed from config, uninstalling"));
            if self.uninstaller.uninstall(&name, &record).await {
                state.tools.remove(&name);
                removed += 1;
                self.reporter.done(&name, "removed");
            } else {
                self.reporter.warning(&format!(
                    "failed to fully uninstall {name}, manual cleanup may be required"
                ));
            }
        }

        self.reporter.summary(installed, removed, failed);
        tracing::debug!(installed, removed, failed, "finished tool reconciliation");
    }
}

fn display_version(version: &str) -> &str {
    if version.is_empty() { "latest" } else { version }
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

    fn synchronizer(dirs: &Dirs) -> Synchronizer<NullReporter> {
        Synchronizer::from_parts(
            Installer::new(NullReporter, dirs.clone()),
            Uninstaller::new(NullReporter, dirs.clone()),
            NullReporter,
        )
    }

    fn url_spec(name: &str, version: &str, url: String) -> ToolSpec {
        ToolSpec {
            name: name.into(),
            version: version.into(),
            source: "direct-url".into(),
            repo: None,
            tag: None,
            url: Some(url),
        }
    }

    #[tokio::test]
    async fn test_reconcile_installs_and_is_idempotent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/bin/demo")
            .with_status(200)
            .with_body(b"#!/bin/sh\necho demo\n".to_vec())
            .expect(1)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let dirs = test_dirs(tmp.path());
        std::fs::create_dir_all(&dirs.system_bin).unwrap();

        let sync = synchronizer(&dirs);
        let desired = vec![url_spec("demo", "1.0.0", format!("{}/bin/demo", server.url()))];
        let mut state = StateStore::default();

        sync.reconcile(&desired, &mut state).await;
        let record = state.tools.get("demo").expect("record written");
        assert_eq!(record.version, "1.0.0");
        assert_eq!(record.install_path, dirs.system_bin.join("demo"));
        assert!(record.managed);
        assert_eq!(record.source, Some(toolsync_schema::SourceKind::DirectUrl));

        // Second pass with the same declaration downloads nothing.
        sync.reconcile(&desired, &mut state).await;
        mock.assert_async().await;
        assert_eq!(state.tools.len(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_upgrades_on_version_mismatch() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/bin/bar")
            .with_status(200)
            .with_body(b"#!/bin/sh\necho v2\n".to_vec())
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let dirs = test_dirs(tmp.path());
        std::fs::create_dir_all(&dirs.system_bin).unwrap();

        let mut state = StateStore::default();
        state.tools.insert(
            "bar".into(),
            ToolRecord {
                version: "1.0.0".into(),
                install_path: dirs.system_bin.join("bar"),
                managed: true,
                source: Some(toolsync_schema::SourceKind::DirectUrl),
            },
        );

        let sync = synchronizer(&dirs);
        let desired = vec![url_spec("bar", "2.0.0", format!("{}/bin/bar", server.url()))];
        sync.reconcile(&desired, &mut state).await;

        assert_eq!(state.tools.get("bar").unwrap().version, "2.0.0");
    }

    #[tokio::test]
    async fn test_reconcile_removes_dropped_tools() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = test_dirs(tmp.path());
        let bin = tmp.path().join("foo");
        std::fs::write(&bin, b"bin").unwrap();

        let mut state = StateStore::default();
        state.tools.insert(
            "foo".into(),
            ToolRecord {
                version: "1.0.0".into(),
                install_path: bin.clone(),
                managed: true,
                source: Some(toolsync_schema::SourceKind::DirectUrl),
            },
        );

        let sync = synchronizer(&dirs);
        sync.reconcile(&[], &mut state).await;

        assert!(!state.tools.contains_key("foo"));
        assert!(!bin.exists());
    }

    #[tokio::test]
    async fn test_reconcile_keeps_record_when_uninstall_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = test_dirs(tmp.path());

        let mut state = StateStore::default();
        state.tools.insert(
            "ghost".into(),
            ToolRecord {
                version: "1.0.0".into(),
                install_path: tmp.path().join("never-existed"),
                managed: true,
                source: Some(toolsync_schema::SourceKind::DirectUrl),
            },
        );

        let sync = synchronizer(&dirs);
        sync.reconcile(&[], &mut state).await;

        // Removal failed; the record survives for the next run.
        assert!(state.tools.contains_key("ghost"));
    }

    #[tokio::test]
    async fn test_reconcile_isolates_per_tool_failures() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/bin/good")
            .with_status(200)
            .with_body(b"#!/bin/sh\n".to_vec())
            .create_async()
            .await;
        server
            .mock("GET", "/bin/bad")
            .with_status(500)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let dirs = test_dirs(tmp.path());
        std::fs::create_dir_all(&dirs.system_bin).unwrap();

        let sync = synchronizer(&dirs);
        let desired = vec![
            url_spec("good", "1.0.0", format!("{}/bin/good", server.url())),
            url_spec("bad", "1.0.0", format!("{}/bin/bad", server.url())),
        ];
        let mut state = StateStore::default();
        sync.reconcile(&desired, &mut state).await;

        assert!(state.tools.contains_key("good"));
        assert!(!state.tools.contains_key("bad"));
    }

    #[tokio::test]
    async fn test_unknown_source_leaves_no_record() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = test_dirs(tmp.path());

        let sync = synchronizer(&dirs);
        let desired = vec![ToolSpec {
            name: "mystery".into(),
            version: "1.0.0".into(),
            source: "npm".into(),
            repo: None,
            tag: None,
            url: None,
        }];
        let mut state = StateStore::default();
        sync.reconcile(&desired, &mut state).await;

        assert!(state.tools.is_empty());
    }

    #[tokio::test]
    async fn test_latest_sentinel_recorded_verbatim() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/bin/cur")
            .with_status(200)
            .with_body(b"#!/bin/sh\n".to_vec())
            .expect(1)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let dirs = test_dirs(tmp.path());
        std::fs::create_dir_all(&dirs.system_bin).unwrap();

        let sync = synchronizer(&dirs);
        let desired = vec![url_spec("cur", "", format!("{}/bin/cur", server.url()))];
        let mut state = StateStore::default();

        sync.reconcile(&desired, &mut state).await;
        assert_eq!(state.tools.get("cur").unwrap().version, "");

        // The sentinel matches itself on the next pass: no reinstall.
        sync.reconcile(&desired, &mut state).await;
    }

    #[test]
    fn test_display_version() {
        assert_eq!(display_version(""), "latest");
        assert_eq!(display_version("1.2.3"), "1.2.3");
    }
}
