//! Runtime configuration of a merge run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{MergeError, MergeResult};
use crate::manifest::ManifestFormat;
use crate::merge::enumerator::DEFAULT_EXTENSIONS;
use crate::merge::progress::DEFAULT_POLL_INTERVAL;
use crate::merge::resolver::DEFAULT_ASSET_DIR;

/// Worker thread count setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadCount {
    /// One worker per available CPU core.
    #[default]
    Auto,
    /// A fixed number of workers. Zero is rejected at validation.
    Fixed(usize),
}

impl ThreadCount {
    /// Resolve to a concrete worker count.
    pub fn resolve(self) -> usize {
        match self {
            ThreadCount::Auto => default_thread_count(),
            ThreadCount::Fixed(n) => n,
        }
    }
}

/// Number of available CPU cores, or 4 if unknown.
pub fn default_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Where the mod order manifest comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSource {
    pub path: PathBuf,
    pub format: ManifestFormat,
}

/// Configuration for a single merge run.
///
/// Without a manifest only the base tier is merged. With one, failing to
/// load it aborts the run.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeConfig {
    /// Base asset tree root (tier 0). Its `asset_dir` subtree is scanned.
    pub base_dir: PathBuf,

    /// Output root; merged files land under `output_dir/asset_dir`.
    pub output_dir: PathBuf,

    /// Mod order manifest defining tiers 1..M.
    pub manifest: Option<ManifestSource>,

    /// Copy worker count.
    pub threads: usize,

    /// Asset subtree name, matched case-insensitively.
    pub asset_dir: String,

    /// Accepted file extensions, matched case-insensitively.
    pub extensions: Vec<String>,

    /// Lower-case merge keys so paths differing only in case collide.
    pub fold_case: bool,

    /// Remove `output_dir/asset_dir` before the first tier.
    pub clean_output: bool,

    /// Remove empty directories from the output tree after the last tier.
    pub prune_empty_dirs: bool,

    /// Progress monitor poll interval.
    pub progress_interval: Duration,
}

impl MergeConfig {
    /// Create a configuration with defaults for everything but the paths.
    pub fn new(base_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            output_dir: output_dir.into(),
            manifest: None,
            threads: default_thread_count(),
            asset_dir: DEFAULT_ASSET_DIR.to_string(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            fold_case: true,
            clean_output: false,
            prune_empty_dirs: true,
            progress_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Use a mod order manifest.
    pub fn with_manifest(mut self, path: impl Into<PathBuf>, format: ManifestFormat) -> Self {
        self.manifest = Some(ManifestSource {
            path: path.into(),
            format,
        });
        self
    }

    /// Set the copy worker count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the asset subtree name.
    pub fn with_asset_dir(mut self, asset_dir: impl Into<String>) -> Self {
        self.asset_dir = asset_dir.into();
        self
    }

    /// Set the accepted file extensions.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fold_case(mut self, fold_case: bool) -> Self {
        self.fold_case = fold_case;
        self
    }

    pub fn with_clean_output(mut self, clean_output: bool) -> Self {
        self.clean_output = clean_output;
        self
    }

    pub fn with_prune_empty_dirs(mut self, prune: bool) -> Self {
        self.prune_empty_dirs = prune;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Directory receiving merged files: `output_dir/asset_dir`.
    pub fn output_asset_root(&self) -> PathBuf {
        self.output_dir.join(&self.asset_dir)
    }

    /// Base directory of the merge.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Reject settings that make a run impossible.
    pub fn validate(&self) -> MergeResult<()> {
        if self.threads == 0 {
            return Err(MergeError::InvalidThreadCount(self.threads));
        }
        if self.asset_dir.trim().is_empty() || self.asset_dir.contains(['/', '\\']) {
            return Err(MergeError::InvalidConfig(format!(
                "asset directory must be a single non-empty path segment, got {:?}",
                self.asset_dir
            )));
        }
        if self.extensions.iter().all(|e| e.trim().trim_start_matches('.').is_empty()) {
            return Err(MergeError::InvalidConfig(
                "at least one asset file extension is required".to_string(),
            ));
        }
        if self.progress_interval.is_zero() {
            return Err(MergeError::InvalidConfig(
                "progress interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
