//! Config defaults: fills values the loaded layers left unset.

use std::path::Path;

use crate::schema::{AppConfig, LoggingConfig, MetronomeConfig, SchedulerSection};

pub const DEFAULT_APP_NAME: &str = "metronome";

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Spool directories live below this base, one per application.
pub const DEFAULT_SPOOL_BASE_DIR: &str = "/var/spool";

/// Oversleep at wake-up tolerated before it counts as downtime (seconds).
pub const DEFAULT_MAXIMUM_TIMER_SLACK_SECS: f64 = 5.0;

/// Per-task lateness tolerated before it counts as downtime (seconds).
pub const DEFAULT_MINIMUM_DOWNTIME_DURATION_SECS: f64 = 20.0;

/// Apply all defaults to a freshly merged config.
pub fn apply_all_defaults(config: MetronomeConfig) -> MetronomeConfig {
    let config = apply_app_defaults(config);
    let config = apply_scheduler_defaults(config);
    apply_logging_defaults(config)
}

/// Name, debug mode, and a spool dir derived from the name.
fn apply_app_defaults(mut config: MetronomeConfig) -> MetronomeConfig {
    let app = config.app.get_or_insert_with(AppConfig::default);
    let name = app.name.get_or_insert_with(|| DEFAULT_APP_NAME.to_string()).clone();
    app.debug_mode.get_or_insert(false);
    if app.spool_dir.is_none() {
        let dir = Path::new(DEFAULT_SPOOL_BASE_DIR).join(name);
        app.spool_dir = Some(dir.to_string_lossy().into_owned());
    }
    config
}

fn apply_scheduler_defaults(mut config: MetronomeConfig) -> MetronomeConfig {
    let scheduler = config.scheduler.get_or_insert_with(SchedulerSection::default);
    scheduler
        .maximum_timer_slack_secs
        .get_or_insert(DEFAULT_MAXIMUM_TIMER_SLACK_SECS);
    scheduler
        .minimum_downtime_duration_secs
        .get_or_insert(DEFAULT_MINIMUM_DOWNTIME_DURATION_SECS);
    scheduler.single_run.get_or_insert(false);
    config
}

fn apply_logging_defaults(mut config: MetronomeConfig) -> MetronomeConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.json.get_or_insert(true);
    config
}
