//! Config validation: checks with user-friendly, path-addressed messages.

use std::collections::HashSet;

use crate::schema::MetronomeConfig;
use metronome_core::MAX_TASK_INTERVAL;
use thiserror::Error;

/// Log level names accepted in `logging.level` (case-insensitive).
pub const KNOWN_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// All errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors joined into one line each, for error messages.
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &MetronomeConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_app(config, &mut report);
    validate_scheduler(config, &mut report);
    validate_logging(config, &mut report);
    validate_tasks(config, &mut report);
    report
}

fn validate_app(config: &MetronomeConfig, report: &mut ValidationReport) {
    let Some(app) = &config.app else { return };
    if app.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        report.error("app.name", "Application name cannot be empty");
    }
}

fn validate_scheduler(config: &MetronomeConfig, report: &mut ValidationReport) {
    let Some(scheduler) = &config.scheduler else { return };
    for (path, value) in [
        ("scheduler.maximumTimerSlackSecs", scheduler.maximum_timer_slack_secs),
        ("scheduler.minimumDowntimeDurationSecs", scheduler.minimum_downtime_duration_secs),
    ] {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                report.error(path, format!("Must be a non-negative number of seconds, got {v}"));
            }
        }
    }
}

fn validate_logging(config: &MetronomeConfig, report: &mut ValidationReport) {
    let Some(level) = config.logging.as_ref().and_then(|l| l.level.as_deref()) else {
        return;
    };
    if !KNOWN_LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        report.error(
            "logging.level",
            format!("Unknown log level '{level}'. Use one of: {}", KNOWN_LOG_LEVELS.join(", ")),
        );
    }
}

fn validate_tasks(config: &MetronomeConfig, report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for (i, task) in config.tasks.iter().enumerate() {
        if task.name.trim().is_empty() {
            report.error(format!("tasks[{i}].name"), "Task name cannot be empty");
        } else if !seen.insert(task.name.as_str()) {
            report.warn(
                format!("tasks[{i}].name"),
                format!("Duplicate task name '{}'", task.name),
            );
        }
        if task.interval_secs == 0 {
            report.error(format!("tasks[{i}].intervalSecs"), "intervalSecs must be >= 1");
        } else if task.interval_secs > MAX_TASK_INTERVAL.as_secs() {
            report.error(
                format!("tasks[{i}].intervalSecs"),
                format!("intervalSecs must be <= {}", MAX_TASK_INTERVAL.as_secs()),
            );
        }
    }
}
