//! Merge-key resolution for source files.
//!
//! Every file contributed by a tier is identified by a [`RelativeKey`]: its
//! path relative to a virtual asset root (e.g. `textures/`). Two files with
//! the same key compete for the same output entry, and the higher-priority
//! tier wins.
//!
//! # Resolution Order
//!
//! ```text
//! <tier_root>/textures/armor/iron.dds          → armor/iron.dds    (asset root)
//! <tier_root>/Data/Textures/armor/iron.dds     → armor/iron.dds    (first asset ancestor)
//! <tier_root>/loose/iron.dds                   → iron.dds          (base name, warned)
//! ```
//!
//! The asset directory name is matched case-insensitively at every step.
//! Base-name fallback drops all directory structure, so two unrelated
//! `iron.dds` files without an asset ancestor collide on the same key. That
//! collision is kept: the later (or higher-priority) writer wins.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::warn;

/// Default name of the asset subtree shared by the base tree and mods.
pub const DEFAULT_ASSET_DIR: &str = "textures";

/// Errors that prevent a file from receiving a merge key.
///
/// These are per-file and never abort a merge: the file is skipped and the
/// error is logged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Nothing remains after the asset directory segment.
    #[error("cannot derive merge key for {}: nothing follows the asset directory", path.display())]
    EmptyKey { path: PathBuf },

    /// The path has no final file name component.
    #[error("cannot derive merge key for {}: path has no file name", path.display())]
    NoFileName { path: PathBuf },
}

/// Normalized merge identity of an asset, always `/`-separated and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelativeKey(String);

impl RelativeKey {
    /// Build a key from path segments, or `None` if no segment is non-empty.
    fn from_segments(segments: &[String], fold_case: bool) -> Option<Self> {
        let joined = segments
            .iter()
            .filter(|s| !s.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("/");

        if joined.is_empty() {
            return None;
        }

        Some(Self(if fold_case {
            joined.to_lowercase()
        } else {
            joined
        }))
    }

    /// The key as a `/`-separated string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key as a relative filesystem path.
    pub fn to_path(&self) -> PathBuf {
        self.0.split('/').collect()
    }
}

impl fmt::Display for RelativeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which rule produced a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// The file lives under `<tier_root>/<asset_dir>/`.
    AssetRoot,
    /// The file has an `<asset_dir>` ancestor deeper inside the tier.
    AssetAncestor,
    /// No asset ancestor; only the file name was kept.
    BaseName,
}

/// A successfully resolved merge key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub key: RelativeKey,
    pub source: KeySource,
}

impl Resolution {
    /// Whether the key was produced by the base-name fallback.
    pub fn is_fallback(&self) -> bool {
        self.source == KeySource::BaseName
    }
}

/// Maps source file paths to merge keys.
///
/// Pure apart from a single warning per base-name fallback.
#[derive(Debug, Clone)]
pub struct PathResolver {
    asset_dir: String,
    fold_case: bool,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new(DEFAULT_ASSET_DIR)
    }
}

impl PathResolver {
    /// Create a resolver for the given asset directory name.
    ///
    /// Case folding of keys is enabled by default.
    pub fn new(asset_dir: impl Into<String>) -> Self {
        Self {
            asset_dir: asset_dir.into(),
            fold_case: true,
        }
    }

    /// Enable or disable lower-casing of resolved keys.
    pub fn with_fold_case(mut self, fold_case: bool) -> Self {
        self.fold_case = fold_case;
        self
    }

    /// Name of the asset directory this resolver looks for.
    pub fn asset_dir(&self) -> &str {
        &self.asset_dir
    }

    /// Whether keys are lower-cased.
    pub fn fold_case(&self) -> bool {
        self.fold_case
    }

    /// Resolve the merge key of `source`, a file contributed by the tier
    /// rooted at `tier_root`.
    ///
    /// When `source` lies under `tier_root`, only the components below the
    /// root are searched for an asset ancestor. An asset directory above the
    /// root (`/srv/textures/mods/ModA/loose/rock.dds` with root
    /// `/srv/textures/mods/ModA`) is ignored and the file falls back to its
    /// base name. Sources outside the root are searched along the whole path.
    pub fn resolve(&self, source: &Path, tier_root: &Path) -> Result<Resolution, ResolveError> {
        let source_segments = normal_segments(source);
        let root_segments = normal_segments(tier_root);
        let relative = strip_prefix_ignore_case(&source_segments, &root_segments);

        if let Some(rest) = relative {
            if let Some((first, remainder)) = rest.split_first() {
                if same_name(first, &self.asset_dir) {
                    return self.finish(source, remainder, KeySource::AssetRoot);
                }
            }
        }

        // Outside the tier root the whole path is searched.
        let scope = relative.unwrap_or(&source_segments);
        let directories = &scope[..scope.len().saturating_sub(1)];
        if let Some(pos) = directories
            .iter()
            .position(|segment| same_name(segment, &self.asset_dir))
        {
            return self.finish(source, &scope[pos + 1..], KeySource::AssetAncestor);
        }

        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ResolveError::NoFileName {
                path: source.to_path_buf(),
            })?;
        let resolution = self.finish(source, &[name], KeySource::BaseName)?;

        warn!(
            path = %source.display(),
            key = %resolution.key,
            asset_dir = %self.asset_dir,
            "No asset directory in path, falling back to file name (directory structure is lost)"
        );

        Ok(resolution)
    }

    fn finish(
        &self,
        source: &Path,
        segments: &[String],
        key_source: KeySource,
    ) -> Result<Resolution, ResolveError> {
        RelativeKey::from_segments(segments, self.fold_case)
            .map(|key| Resolution {
                key,
                source: key_source,
            })
            .ok_or_else(|| ResolveError::EmptyKey {
                path: source.to_path_buf(),
            })
    }
}

/// Named components of a path; root, prefix and `.`/`..` are dropped.
fn normal_segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

fn strip_prefix_ignore_case<'a>(path: &'a [String], prefix: &[String]) -> Option<&'a [String]> {
    if prefix.len() > path.len() {
        return None;
    }

    path.iter()
        .zip(prefix)
        .all(|(a, b)| same_name(a, b))
        .then(|| &path[prefix.len()..])
}

fn same_name(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}
