//! `metronome-config`: runtime configuration for the Metronome host.
//!
//! Provides:
//! - Typed config schema (app, scheduler thresholds, logging, heartbeat tasks)
//! - Layered YAML loading and atomic write with backup rotation
//! - `${ENV_VAR}` substitution
//! - `METRONOME_SECTION__OPTION` and `section.option=value` overrides
//! - Default value application
//! - Validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod overrides;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{collect_referenced_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, json_merge_patch, load_config_value, user_config_path, write_config};
pub use overrides::{env_overrides, parse_option};
pub use schema::{AppConfig, LoggingConfig, MetronomeConfig, SchedulerSection, TaskConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use metronome_core::MetronomeError;
use serde_json::Value;

/// Load every file in order (later files win), then apply env substitution,
/// environment and command-line overrides, defaults and validation.
///
/// This is the main entry point for loading a config at runtime.
pub async fn load_and_prepare(paths: &[PathBuf], options: &[String]) -> Result<MetronomeConfig> {
    let merged = load_merged(paths).await?;
    let env: HashMap<String, String> = std::env::vars().collect();
    prepare(merged, options, &env)
}

/// Merge the raw value trees of all files, later files winning. Nothing is
/// substituted or validated yet.
pub async fn load_merged(paths: &[PathBuf]) -> Result<Value> {
    let mut merged = Value::Object(Default::default());
    for path in paths {
        let layer = load_config_value(path).await?;
        json_merge_patch(&mut merged, &layer);
    }
    Ok(merged)
}

/// Everything after file loading; `env` stands in for the process
/// environment.
pub fn prepare(
    merged: Value,
    options: &[String],
    env: &HashMap<String, String>,
) -> Result<MetronomeConfig> {
    let mut value = resolve_env_vars_with(&merged, env)
        .map_err(|e| MetronomeError::ConfigError(e.to_string()))?;

    for patch in env_overrides(env)? {
        json_merge_patch(&mut value, &patch);
    }
    for option in options {
        json_merge_patch(&mut value, &parse_option(option)?);
    }

    let config: MetronomeConfig = serde_json::from_value(value)
        .map_err(|e| MetronomeError::ConfigError(format!("Invalid configuration: {e}")))?;
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    if !report.is_valid() {
        for error in &report.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
        return Err(MetronomeError::ConfigError(report.error_summary()).into());
    }

    Ok(config)
}
