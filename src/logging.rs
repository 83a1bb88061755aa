//! Logging setup for reportforge runs.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the embedding application. [`init`] wires up console output plus two daily
//! rotating files, [`init_console`] is the lighter variant the CLI uses.
//!
//! ```no_run
//! use reportforge::logging;
//!
//! logging::init(None).expect("Failed to initialize logging");
//! tracing::info!("Run started");
//! ```

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

const APP_DIR: &str = "reportforge";
const MAX_LOG_FILES: usize = 10;

/// Platform log directory, created if needed.
///
/// - Windows: `%APPDATA%/reportforge/logs`
/// - macOS: `~/Library/Application Support/reportforge/logs`
/// - Linux: `~/.local/share/reportforge/logs`
pub fn get_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;
    let log_dir = base_dir.join(APP_DIR).join("logs");

    if !log_dir.exists() {
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    }

    Ok(log_dir)
}

fn env_filter() -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")
}

fn daily_appender(log_dir: &Path, prefix: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(log_dir)
        .with_context(|| format!("Failed to create {prefix} file appender"))
}

/// Install console output plus `reportforge.<date>.log` (all levels) and
/// `error.<date>.log` (warnings and errors) in `log_dir`, or in
/// [`get_log_dir`] when `None`.
///
/// # Errors
///
/// Returns an error if the directory or the appenders cannot be created, or
/// if a global subscriber is already installed.
pub fn init(log_dir: Option<PathBuf>) -> Result<()> {
    let log_dir = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            dir
        }
        None => get_log_dir()?,
    };

    let all_logs_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(daily_appender(&log_dir, APP_DIR)?);

    let error_logs_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(daily_appender(&log_dir, "error")?)
        .with_filter(EnvFilter::new("warn"));

    let stdout_layer = fmt::layer().with_target(true).with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter()?)
        .with(stdout_layer)
        .with(all_logs_layer)
        .with(error_logs_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!("Logging initialized, log directory: {}", log_dir.display());

    Ok(())
}

/// Install a compact stderr-only subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_console() -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter()?)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init()
        .context("Failed to install tracing subscriber")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_log_dir() {
        let log_dir = get_log_dir().expect("Failed to get log dir");
        assert!(log_dir.ends_with("reportforge/logs") || log_dir.ends_with("reportforge\\logs"));
    }

    #[test]
    fn test_init_writes_into_given_dir() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("logs");

        // Another test may have installed the global subscriber first.
        if init(Some(dir.clone())).is_ok() {
            tracing::warn!("logging smoke test");
        }
        assert!(dir.is_dir());
    }
}
