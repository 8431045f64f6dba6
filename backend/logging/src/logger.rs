//! Structured Logger
//!
//! Wraps `tracing` to provide JSON-formatted file output (NDJSON, rotated
//! daily) and environment-based level control.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the global logger for the server.
/// Creates a console logger and a rolling file logger.
pub fn init_logger<P: AsRef<Path>>(log_dir: P, level: &str) {
    // Writes NDJSON to `{log_dir}/studymate.log.YYYY-MM-DD`
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "studymate.log");

    let file_layer = fmt::layer()
        .json()
        .with_writer(file_appender)
        .with_ansi(false);

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_ansi(true);

    // Already initialized (tests, repeated CLI setup) is not an error.
    let _ = tracing_subscriber::registry()
        .with(filter(level))
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

/// Initialize a stderr-only logger for one-shot CLI commands, keeping stdout
/// free for command output.
pub fn init_console_logger(level: &str) {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter(level))
        .with(console_layer)
        .try_init();
}
