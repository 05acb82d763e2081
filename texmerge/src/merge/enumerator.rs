//! Lazy, extension-filtered file enumeration per tier.
//!
//! The enumerator never fails: a missing or unreadable scan root produces an
//! empty sequence and a warning, and unreadable entries encountered during
//! the walk are skipped with a warning.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::tier::{FileRecord, Tier};

/// Default asset extensions, matched case-insensitively.
pub const DEFAULT_EXTENSIONS: &[&str] = &["dds", "png", "tga", "bmp"];

/// Case-insensitive file extension filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS.iter().copied())
    }
}

impl ExtensionFilter {
    /// Create a filter from extensions, with or without a leading dot.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { extensions }
    }

    /// Whether `path` carries one of the accepted extensions.
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }

    /// The accepted extensions, lower-cased.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

/// Lists eligible files for a tier.
#[derive(Debug, Clone, Default)]
pub struct WorkEnumerator {
    filter: ExtensionFilter,
}

impl WorkEnumerator {
    pub fn new(filter: ExtensionFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &ExtensionFilter {
        &self.filter
    }

    /// Start a single pass over the tier's scan root.
    pub fn enumerate(&self, tier: Arc<Tier>) -> TierFiles {
        let scan_root = &tier.scan_root;

        let walker = if scan_root.is_dir() {
            debug!(tier = %tier, path = %scan_root.display(), "Enumerating tier");
            Some(
                WalkDir::new(scan_root)
                    .follow_links(true)
                    .sort_by_file_name()
                    .into_iter(),
            )
        } else {
            warn!(
                tier = %tier,
                path = %scan_root.display(),
                "Tier directory is missing or not a directory, skipping"
            );
            None
        };

        TierFiles {
            tier,
            walker,
            filter: self.filter.clone(),
        }
    }
}

/// Lazy sequence of [`FileRecord`]s for one tier.
///
/// Consumed once; walking again requires a new call to
/// [`WorkEnumerator::enumerate`].
pub struct TierFiles {
    tier: Arc<Tier>,
    walker: Option<walkdir::IntoIter>,
    filter: ExtensionFilter,
}

impl TierFiles {
    pub fn tier(&self) -> &Arc<Tier> {
        &self.tier
    }
}

impl Iterator for TierFiles {
    type Item = FileRecord;

    fn next(&mut self) -> Option<FileRecord> {
        let walker = self.walker.as_mut()?;

        loop {
            match walker.next()? {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.filter.matches(entry.path()) {
                        return Some(FileRecord::new(entry.into_path(), Arc::clone(&self.tier)));
                    }
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    warn!(
                        tier = %self.tier,
                        path = %path,
                        error = %e,
                        "Skipping inaccessible entry during enumeration"
                    );
                }
            }
        }
    }
}
