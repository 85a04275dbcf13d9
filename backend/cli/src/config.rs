use std::path::PathBuf;

use clap::Args;
use metronome_config::MetronomeConfig;
use metronome_scheduler::SchedulerConfig;

use logging::LoggerOptions;

/// Config sources shared by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Configuration file; repeat to layer files (later ones win)
    #[arg(short, long = "config", value_name = "FILE")]
    pub configs: Vec<PathBuf>,

    /// Override a setting, e.g. `scheduler.single_run=true`
    #[arg(short = 'o', long = "option", value_name = "SECTION.OPTION=VALUE")]
    pub options: Vec<String>,
}

impl ConfigArgs {
    /// Files to load: the user config file (if present) first, then the
    /// files given on the command line.
    pub fn config_paths(&self, user_config: Option<PathBuf>) -> Vec<PathBuf> {
        user_config
            .filter(|p| p.exists())
            .into_iter()
            .chain(self.configs.iter().cloned())
            .collect()
    }
}

/// Flags of the `run` subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Run one loop iteration and exit
    #[arg(long)]
    pub single_run: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Directory for rolling log files
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Human-readable console output instead of JSON lines
    #[arg(long)]
    pub no_json: bool,
}

impl RunArgs {
    /// Command-line flags expressed as setting overrides, applied after
    /// any explicit `--option`.
    pub fn options(&self) -> Vec<String> {
        let mut options = self.config.options.clone();
        if self.single_run {
            options.push("scheduler.single_run=true".to_string());
        }
        if let Some(level) = &self.log_level {
            options.push(format!("logging.level={level}"));
        }
        if let Some(dir) = &self.log_dir {
            options.push(format!("logging.dir={}", dir.display()));
        }
        if self.no_json {
            options.push("logging.json=false".to_string());
        }
        options
    }
}

pub fn to_scheduler_config(config: &MetronomeConfig) -> SchedulerConfig {
    SchedulerConfig {
        maximum_timer_slack: config.maximum_timer_slack(),
        minimum_downtime_duration: config.minimum_downtime_duration(),
        debug_mode: config.debug_mode(),
        single_run: config.single_run(),
    }
}

pub fn to_logger_options(config: &MetronomeConfig) -> LoggerOptions {
    let logging = config.logging.clone().unwrap_or_default();
    LoggerOptions {
        level: config.log_level().to_string(),
        log_dir: logging.dir.map(PathBuf::from),
        json: logging.json.unwrap_or(true),
        ..LoggerOptions::default()
    }
}
