//! Structured logging for Metronome.
//!
//! Console output plus an optional daily-rolling NDJSON file.

pub mod logger;

pub use logger::{init_logger, parse_level, LoggerOptions, DEFAULT_LOG_FILE_NAME};
