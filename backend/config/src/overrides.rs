//! Setting overrides from the environment and the command line.
//!
//! Environment: `METRONOME_<SECTION>__<OPTION>=value`, e.g.
//! `METRONOME_SCHEDULER__SINGLE_RUN=true`.
//! Command line: `section.option=value`, e.g. `app.debug_mode=true` or
//! `app.debugMode=true`.
//!
//! Values are parsed as YAML scalars, so `true`, `3` and `2.5` keep their
//! types. Each override becomes a JSON merge patch applied on top of the
//! config files.

use std::collections::HashMap;

use metronome_core::MetronomeError;
use serde_json::{json, Value};

/// Prefix of environment variables treated as overrides.
pub const ENV_PREFIX: &str = "METRONOME_";

/// Sections that accept scalar overrides.
pub const OVERRIDABLE_SECTIONS: &[&str] = &["app", "scheduler", "logging"];

/// Build a merge patch from one `section.option=value` setting.
pub fn parse_option(setting: &str) -> Result<Value, MetronomeError> {
    let (key, raw) = setting.split_once('=').ok_or_else(|| {
        MetronomeError::ConfigError(format!(
            "Option '{setting}' must be formatted as SECTION.OPTION=VALUE"
        ))
    })?;
    let (section, option) = key.trim().split_once('.').ok_or_else(|| {
        MetronomeError::ConfigError(format!("Option key '{key}' must be SECTION.OPTION"))
    })?;
    patch_for(section, option, raw.trim())
}

/// Collect merge patches from `METRONOME_*` variables, sorted by name so the
/// result does not depend on environment ordering.
pub fn env_overrides(env: &HashMap<String, String>) -> Result<Vec<Value>, MetronomeError> {
    let mut names: Vec<_> = env
        .keys()
        .filter(|k| k.starts_with(ENV_PREFIX) && k.contains("__"))
        .collect();
    names.sort();

    names
        .into_iter()
        .map(|name| {
            let rest = &name[ENV_PREFIX.len()..];
            let (section, option) = rest.split_once("__").unwrap_or((rest, ""));
            patch_for(
                &section.to_ascii_lowercase(),
                &option.to_ascii_lowercase(),
                &env[name],
            )
        })
        .collect()
}

fn patch_for(section: &str, option: &str, raw: &str) -> Result<Value, MetronomeError> {
    if !OVERRIDABLE_SECTIONS.contains(&section) {
        return Err(MetronomeError::ConfigError(format!(
            "Unknown config section '{section}' (expected one of: {})",
            OVERRIDABLE_SECTIONS.join(", ")
        )));
    }
    if option.is_empty() {
        return Err(MetronomeError::ConfigError(format!(
            "Missing option name for section '{section}'"
        )));
    }
    Ok(json!({ section: { to_camel_case(option): parse_scalar(raw) } }))
}

/// `debug_mode` → `debugMode`; names without underscores are kept as given.
fn to_camel_case(option: &str) -> String {
    let mut out = String::with_capacity(option.len());
    let mut upper_next = false;
    for c in option.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_scalar(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::String(String::new());
    }
    match serde_yaml::from_str::<Value>(raw) {
        Ok(v @ (Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Null)) => v,
        _ => Value::String(raw.to_string()),
    }
}
