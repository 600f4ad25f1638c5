//! macOS `defaults` settings sync.
//!
//! Settings already recorded with the same value are skipped; newly
//! applied values are recorded so the next run skips them too.

use std::process::Command;

use toolsync_core::Reporter;
use toolsync_schema::{Setting, SettingRecord, StateStore};

/// Apply declared settings, skipping those already recorded. Returns
/// how many settings were newly applied.
pub fn sync_settings<R: Reporter>(
    settings: &[Setting],
    state: &mut StateStore,
    reporter: &R,
) -> usize {
    let mut applied = 0;

    for setting in settings {
        let key = setting.state_key();
        tracing::debug!(%key, value = %setting.value, "considering setting");

        if state
            .settings
            .get(&key)
            .is_some_and(|prev| prev.value == setting.value)
        {
            reporter.info(&format!("setting {key} already applied, skipping"));
            continue;
        }

        let type_flag = match setting.value_type.as_str() {
            "bool" => "-bool",
            "int" => "-int",
            "float" => "-float",
            _ => "-string",
        };

        let output = Command::new("defaults")
            .args([
                "write",
                setting.domain.as_str(),
                setting.key.as_str(),
                type_flag,
                setting.value.as_str(),
            ])
            .output();

        match output {
            Ok(out) if out.status.success() => {
                reporter.info(&format!("applied setting {key} = {}", setting.value));
                state.settings.insert(
                    key,
                    SettingRecord {
                        domain: setting.domain.clone(),
                        key: setting.key.clone(),
                        value: setting.value.clone(),
                    },
                );
                applied += 1;
            }
            Ok(out) => {
                reporter.error(&format!(
                    "failed to apply setting {key}: {}",
                    String::from_utf8_lossy(&out.stderr).trim()
                ));
            }
            Err(err) => {
                reporter.error(&format!("failed to run defaults for {key}: {err}"));
            }
        }
    }

    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolsync_core::NullReporter;

    #[test]
    fn test_already_applied_settings_are_skipped() {
        let setting = Setting {
            domain: "com.example.app".into(),
            key: "ShowThings".into(),
            value: "true".into(),
            value_type: "bool".into(),
        };

        let mut state = StateStore::default();
        state.settings.insert(
            setting.state_key(),
            SettingRecord {
                domain: setting.domain.clone(),
                key: setting.key.clone(),
                value: setting.value.clone(),
            },
        );

        // Nothing to apply: the recorded value already matches, so no
        // external command runs.
        let applied = sync_settings(&[setting], &mut state, &NullReporter);
        assert_eq!(applied, 0);
    }

    #[test]
    fn test_state_key_format() {
        let setting = Setting {
            domain: "com.apple.dock".into(),
            key: "autohide".into(),
            value: "1".into(),
            value_type: "int".into(),
        };
        assert_eq!(setting.state_key(), "com.apple.dock:autohide");
    }
}
