//! Fatal errors for a merge run.
//!
//! Everything here aborts a run before the first tier starts. Per-file
//! problems (missing tiers, unresolvable keys, failed copies) are logged and
//! counted instead; see [`crate::merge::MergeSummary`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::manifest::ManifestError;

/// Result type for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Errors that abort a merge run.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Thread count is zero.
    #[error("invalid thread count {0}: at least one worker thread is required")]
    InvalidThreadCount(usize),

    /// Configuration is incomplete or inconsistent.
    #[error("invalid merge configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be turned into a merge configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Mod order manifest could not be loaded.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The previous output could not be removed before the run.
    #[error("failed to clean output directory {}: {source}", path.display())]
    CleanOutput { path: PathBuf, source: io::Error },

    /// The copy worker pool could not be created.
    #[error("failed to start copy workers: {0}")]
    WorkerPool(String),
}
