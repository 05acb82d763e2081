//! Logging setup.
//!
//! Installs a `tracing` subscriber with a console layer on stderr and an
//! optional plain-text file layer. The file layer writes through a
//! non-blocking appender; keep the returned [`LoggingGuard`] alive until
//! the run ends or buffered lines are lost.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Errors from logging initialization.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log file path has no file name.
    #[error("invalid log file path {}", path.display())]
    InvalidPath { path: PathBuf },

    /// The log directory could not be created.
    #[error("failed to create log directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    /// A global subscriber is already installed.
    #[error("failed to install log subscriber: {0}")]
    Init(String),
}

/// Logging options.
#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Plain-text log file. Appended to when it exists.
    pub log_file: Option<PathBuf>,
    /// Log at debug level instead of info.
    pub verbose: bool,
    /// Only show warnings and errors on the console, e.g. while a progress
    /// bar owns the terminal. The log file is unaffected.
    pub quiet_console: bool,
}

/// Keeps the file appender's worker alive.
#[must_use = "dropping the guard stops the log file writer"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the console level.
pub fn init_logging(options: LoggingOptions) -> Result<LoggingGuard, LoggingError> {
    let level = if options.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let console_default = if options.quiet_console {
        LevelFilter::WARN
    } else {
        level
    };

    let console_filter = EnvFilter::builder()
        .with_default_directive(console_default.into())
        .from_env_lossy();

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(LocalTime::rfc_3339())
        .with_target(false)
        .with_filter(console_filter);

    let (file_layer, file_guard) = match &options.log_file {
        Some(path) => {
            let (directory, file_name) = split_log_path(path)?;
            fs::create_dir_all(&directory).map_err(|source| LoggingError::CreateDir {
                path: directory.clone(),
                source,
            })?;

            let appender = tracing_appender::rolling::never(&directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTime::rfc_3339())
                .with_thread_names(true)
                .with_filter(level);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Split a log file path into its directory and file name.
fn split_log_path(path: &Path) -> Result<(PathBuf, String), LoggingError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| LoggingError::InvalidPath {
            path: path.to_path_buf(),
        })?;

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    Ok((directory, file_name))
}
