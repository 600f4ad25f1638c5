//! Shell alias sync.
//!
//! Appends alias lines and raw config lines to the user's shell rc
//! file, deduplicated against what is already there.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use toolsync_core::Reporter;
use toolsync_schema::AliasConfig;

/// Append declared aliases to the rc file of the configured (or
/// detected) shell.
pub fn sync_aliases<R: Reporter>(aliases: &AliasConfig, reporter: &R) {
    let Some(home) = dirs::home_dir() else {
        reporter.error("cannot resolve home directory for alias sync");
        return;
    };

    let shell = aliases.shell.clone().unwrap_or_else(detect_shell);
    let rc_name = match shell.as_str() {
        "zsh" => ".zshrc",
        "bash" => ".bashrc",
        other => {
            reporter.warning(&format!("unknown shell '{other}', defaulting to .zshrc"));
            ".zshrc"
        }
    };
    let rc_path = home.join(rc_name);

    if let Err(err) = append_aliases(&rc_path, aliases, reporter) {
        reporter.error(&format!(
            "failed to update {}: {err}",
            rc_path.display()
        ));
    }
}

/// Identify the user's shell from `$SHELL`, defaulting to zsh.
fn detect_shell() -> String {
    let shell = std::env::var("SHELL").unwrap_or_default();
    if shell.contains("zsh") {
        "zsh".to_string()
    } else if shell.contains("bash") {
        "bash".to_string()
    } else {
        "zsh".to_string()
    }
}

fn append_aliases<R: Reporter>(
    rc_path: &Path,
    aliases: &AliasConfig,
    reporter: &R,
) -> io::Result<()> {
    let mut existing: HashSet<String> = fs::read_to_string(rc_path)
        .map(|content| content.lines().map(|l| l.trim().to_string()).collect())
        .unwrap_or_default();

    let mut file = OpenOptions::new().create(true).append(true).open(rc_path)?;

    for raw in &aliases.raw_configs {
        for line in raw.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || existing.contains(trimmed) {
                continue;
            }
            writeln!(file, "{trimmed}")?;
            reporter.info(&format!("added shell config: {trimmed}"));
            existing.insert(trimmed.to_string());
        }
    }

    for alias in &aliases.entries {
        let line = format!("alias {}=\"{}\"", alias.name, alias.value);
        if existing.contains(&line) {
            tracing::debug!(alias = %alias.name, "alias already present");
            continue;
        }
        writeln!(file, "{line}")?;
        reporter.info(&format!("added alias: {line}"));
        existing.insert(line);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolsync_core::NullReporter;
    use toolsync_schema::Alias;

    fn config(entries: Vec<Alias>, raw: Vec<String>) -> AliasConfig {
        AliasConfig {
            shell: Some("zsh".into()),
            raw_configs: raw,
            entries,
        }
    }

    #[test]
    fn test_appends_new_aliases_once() {
        let tmp = tempfile::tempdir().unwrap();
        let rc = tmp.path().join(".zshrc");

        let aliases = config(
            vec![Alias {
                name: "gs".into(),
                value: "git status".into(),
            }],
            vec!["export EDITOR=vim".into()],
        );

        append_aliases(&rc, &aliases, &NullReporter).unwrap();
        append_aliases(&rc, &aliases, &NullReporter).unwrap();

        let content = fs::read_to_string(&rc).unwrap();
        assert_eq!(
            content.matches("alias gs=\"git status\"").count(),
            1,
            "duplicate aliases must not be appended"
        );
        assert_eq!(content.matches("export EDITOR=vim").count(), 1);
    }

    #[test]
    fn test_preserves_existing_content() {
        let tmp = tempfile::tempdir().unwrap();
        let rc = tmp.path().join(".zshrc");
        fs::write(&rc, "# my rc\nalias ll=\"ls -al\"\n").unwrap();

        let aliases = config(
            vec![Alias {
                name: "ll".into(),
                value: "ls -al".into(),
            }],
            vec![],
        );
        append_aliases(&rc, &aliases, &NullReporter).unwrap();

        let content = fs::read_to_string(&rc).unwrap();
        assert!(content.starts_with("# my rc\n"));
        assert_eq!(content.matches("alias ll=").count(), 1);
    }

    #[test]
    fn test_detect_shell_defaults_to_zsh() {
        // Whatever $SHELL is here, the function returns one of the two
        // supported shells.
        let shell = detect_shell();
        assert!(shell == "zsh" || shell == "bash");
    }
}
