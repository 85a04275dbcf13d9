//! Config file read/write with atomic backup rotation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use metronome_core::MetronomeError;
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::schema::MetronomeConfig;

/// User config file name within the config directory.
const USER_CONFIG_FILE_NAME: &str = "metronome.conf";

/// Number of rolling backups to keep.
const MAX_BACKUPS: usize = 5;

/// Resolve the Metronome config directory.
/// Priority: `METRONOME_CONFIG_DIR` env > platform config dir (`~/.config`).
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("METRONOME_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"))
}

/// Path of the per-user config file.
pub fn user_config_path(config_dir: &Path) -> PathBuf {
    config_dir.join(USER_CONFIG_FILE_NAME)
}

/// Read one config file as an untyped value tree.
///
/// Returns an empty object if the file doesn't exist or is empty.
pub async fn load_config_value(path: &Path) -> Result<Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; skipping");
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path).await.map_err(|e| {
        MetronomeError::ConfigError(format!("Failed to read {}: {e}", path.display()))
    })?;

    let value: Value = serde_yaml::from_str(&raw).map_err(|e| {
        MetronomeError::ConfigError(format!("Failed to parse YAML at {}: {e}", path.display()))
    })?;

    info!(path = %path.display(), "Loaded config");
    Ok(match value {
        Value::Null => Value::Object(Default::default()),
        other => other,
    })
}

/// Write config to disk atomically (write to temp file, rename).
///
/// Creates a rolling backup of the previous file before overwriting.
pub async fn write_config(config: &MetronomeConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create config directory: {}", parent.display())
        })?;
    }

    if path.exists() {
        rotate_backups(path).await?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    let tmp_path = with_suffix(path, ".tmp");
    fs::write(&tmp_path, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp config: {}", tmp_path.display()))?;

    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to rename temp config to: {}", path.display()))?;

    info!(path = %path.display(), "Wrote config");
    Ok(())
}

/// Rotate backups: `<file>.bak.1` → `.bak.2` → ... → `.bak.N`.
async fn rotate_backups(path: &Path) -> Result<()> {
    for i in (1..MAX_BACKUPS).rev() {
        let old = with_suffix(path, &format!(".bak.{i}"));
        let new = with_suffix(path, &format!(".bak.{}", i + 1));
        if old.exists() {
            if let Err(e) = fs::rename(&old, &new).await {
                warn!("Failed to rotate backup {}: {}", old.display(), e);
            }
        }
    }

    let bak = with_suffix(path, ".bak.1");
    if let Err(e) = fs::copy(path, &bak).await {
        warn!("Failed to create backup {}: {}", bak.display(), e);
    }

    Ok(())
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// RFC 7396 JSON Merge Patch algorithm.
pub fn json_merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Default::default());
    }
    if let Value::Object(target_map) = target {
        for (key, patch_val) in patch_map {
            if patch_val.is_null() {
                target_map.remove(key);
            } else {
                let entry = target_map.entry(key.clone()).or_insert(Value::Null);
                json_merge_patch(entry, patch_val);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TaskConfig;

    #[test]
    fn merge_patch_overrides_nested_key() {
        let mut base = serde_json::json!({"app": {"name": "a", "debugMode": false}});
        json_merge_patch(&mut base, &serde_json::json!({"app": {"debugMode": true}}));
        assert_eq!(base, serde_json::json!({"app": {"name": "a", "debugMode": true}}));
    }

    #[test]
    fn merge_patch_null_removes_section() {
        let mut base = serde_json::json!({"app": {"name": "a"}, "logging": {"level": "info"}});
        json_merge_patch(&mut base, &serde_json::json!({ "logging": null }));
        assert_eq!(base, serde_json::json!({"app": {"name": "a"}}));
    }

    #[tokio::test]
    async fn missing_file_is_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let value = load_config_value(&dir.path().join("absent.yaml")).await.unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[tokio::test]
    async fn invalid_yaml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        tokio::fs::write(&path, "app: [unclosed").await.unwrap();
        let err = load_config_value(&path).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MetronomeError>(),
            Some(MetronomeError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn write_then_load_with_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("metronome.conf");
        let mut config = MetronomeConfig::default();
        config.tasks.push(TaskConfig {
            name: "heartbeat".to_string(),
            interval_secs: 30,
            fixed_schedule: true,
            enabled: true,
        });

        write_config(&config, &path).await.unwrap();
        write_config(&config, &path).await.unwrap();

        assert!(with_suffix(&path, ".bak.1").exists());
        assert!(!with_suffix(&path, ".tmp").exists());
        let loaded: MetronomeConfig =
            serde_json::from_value(load_config_value(&path).await.unwrap()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn user_config_lives_in_config_dir() {
        let path = user_config_path(Path::new("/home/u/.config"));
        assert_eq!(path, PathBuf::from("/home/u/.config/metronome.conf"));
    }
}
