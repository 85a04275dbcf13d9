//! Structured Logger
//!
//! Wraps `tracing` to provide JSON-formatted output, file rotation (NDJSON),
//! and environment-based level control.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_LOG_FILE_NAME: &str = "metronome.log";

#[derive(Debug, Clone)]
pub struct LoggerOptions {
    /// Filter directive used when `RUST_LOG` is not set.
    pub level: String,
    /// Directory for the rolling file; no file output when `None`.
    pub log_dir: Option<PathBuf>,
    pub file_name: String,
    /// JSON lines on the console instead of human-readable output.
    pub json: bool,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            file_name: DEFAULT_LOG_FILE_NAME.to_string(),
            json: false,
        }
    }
}

/// Map a configured level name to a `tracing` level.
///
/// Accepts the usual names in any case, plus `warning`.
pub fn parse_level(name: &str) -> Result<Level> {
    Ok(match name.trim().to_ascii_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" | "warning" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        other => bail!("Unknown log level '{other}'"),
    })
}

/// Initialize the global structured logger.
///
/// A second call is a no-op: the first subscriber stays installed.
pub fn init_logger(options: &LoggerOptions) -> Result<()> {
    let level = parse_level(&options.level)?;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    // Rolling file appender: writes NDJSON to `<dir>/<file_name>.YYYY-MM-DD`
    let file_layer = match &options.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create log directory {}", dir.display()))?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, &options.file_name);
            Some(fmt::layer().json().with_writer(appender).with_ansi(false))
        }
        None => None,
    };

    let json_console = options
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stdout));
    let plain_console = (!options.json).then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
            .with_ansi(true)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_console)
        .with(plain_console)
        .with(file_layer)
        .try_init();
    Ok(())
}
