//! Configuration for texmerge.
//!
//! Two layers:
//!
//! - [`ConfigFile`]: the user's `config.ini`, loaded with missing keys
//!   filled from defaults.
//! - [`MergeConfig`]: the validated settings of a single run, built from a
//!   config file and CLI overrides.

mod file;
mod merge;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use file::{
    config_file_path, derive_mods_dir, parse_threads, ConfigFile, ManifestKind,
    ManifestSettings, MergeSettings, PathsSettings, ProgressSettings,
};
pub use merge::{default_thread_count, ManifestSource, MergeConfig, ThreadCount};

/// Errors from reading or interpreting the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or is not valid INI.
    #[error("failed to read config file {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    /// The file could not be written.
    #[error("failed to write config file {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    /// A required key has no value.
    #[error("missing required setting [{section}] {key}")]
    Missing {
        section: &'static str,
        key: &'static str,
    },

    /// A key has a value that cannot be interpreted.
    #[error("invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
