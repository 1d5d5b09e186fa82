//! Debug logging support for lined
//!
//! When debug mode is enabled via config, engine diagnostics are written to
//! ~/.lined/lined.log. This is separate from the audit log, which records
//! content changes for the user.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, registry};

/// Environment variable holding the diagnostics filter directives
pub const LOG_FILTER_ENV: &str = "LINED_LOG";
const DEFAULT_FILTER: &str = "lined=info";
const LOG_FILE_NAME: &str = "lined.log";

/// Initialize the debug logging system
///
/// Returns the path to the log file, or None if logging is not enabled or
/// the log file cannot be opened.
pub fn init_debug_logging(debug_enabled: bool) -> Result<Option<PathBuf>> {
    if !debug_enabled {
        return Ok(None);
    }

    let log_path = get_log_path()?;
    let appender = match open_appender(&log_path) {
        Ok(appender) => appender,
        Err(e) => {
            // Diagnostics are optional; editing goes on without them
            eprintln!("Warning: Could not create log file: {:#}", e);
            return Ok(None);
        }
    };

    let subscriber = registry()
        .with(
            fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .with(filter_from_env());

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    Ok(Some(log_path))
}

fn filter_from_env() -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn open_appender(log_path: &Path) -> Result<RollingFileAppender> {
    let dir = log_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Log path has no parent: {}", log_path.display()))?;
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_NAME)
        .build(dir)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))
}

/// Get the diagnostics log path, ~/.lined/lined.log
pub fn get_log_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home_dir.join(".lined").join(LOG_FILE_NAME))
}
