//! Metronome configuration schema.
//!
//! Every scalar is optional so partial files can be layered; fallbacks live
//! in [`crate::defaults`] and are applied after all layers are merged.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_APP_NAME, DEFAULT_LOG_LEVEL, DEFAULT_MAXIMUM_TIMER_SLACK_SECS,
    DEFAULT_MINIMUM_DOWNTIME_DURATION_SECS,
};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetronomeConfig {
    /// Application identity and failure policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<AppConfig>,

    /// Event loop thresholds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<SchedulerSection>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    /// Heartbeat tasks registered by the host
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<TaskConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Fail fast on errors inside the event loop instead of logging them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spool_dir: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_timer_slack_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_downtime_duration_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_run: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for rolling log files; console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskConfig {
    pub name: String,
    pub interval_secs: u64,
    #[serde(default)]
    pub fixed_schedule: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Resolved accessors
// ---------------------------------------------------------------------------

impl MetronomeConfig {
    pub fn app_name(&self) -> &str {
        self.app
            .as_ref()
            .and_then(|a| a.name.as_deref())
            .unwrap_or(DEFAULT_APP_NAME)
    }

    pub fn debug_mode(&self) -> bool {
        self.app.as_ref().and_then(|a| a.debug_mode).unwrap_or(false)
    }

    pub fn single_run(&self) -> bool {
        self.scheduler.as_ref().and_then(|s| s.single_run).unwrap_or(false)
    }

    pub fn maximum_timer_slack(&self) -> Duration {
        secs_or(
            self.scheduler.as_ref().and_then(|s| s.maximum_timer_slack_secs),
            DEFAULT_MAXIMUM_TIMER_SLACK_SECS,
        )
    }

    pub fn minimum_downtime_duration(&self) -> Duration {
        secs_or(
            self.scheduler.as_ref().and_then(|s| s.minimum_downtime_duration_secs),
            DEFAULT_MINIMUM_DOWNTIME_DURATION_SECS,
        )
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Tasks with `enabled: true`.
    pub fn enabled_tasks(&self) -> impl Iterator<Item = &TaskConfig> {
        self.tasks.iter().filter(|t| t.enabled)
    }
}

/// Negative, NaN or otherwise unrepresentable values fall back to `default`.
fn secs_or(value: Option<f64>, default: f64) -> Duration {
    value
        .and_then(|v| Duration::try_from_secs_f64(v).ok())
        .unwrap_or_else(|| Duration::from_secs_f64(default))
}
