//! Tiers and the file records they contribute.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Priority of the base asset tree.
pub const BASE_PRIORITY: u32 = 0;

/// A source tree with a priority rank in the merge.
///
/// Tier 0 is always the base asset tree; mods get increasing priorities in
/// manifest order. A higher priority overrides a lower one for the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tier {
    /// Priority rank (0 = base).
    pub priority: u32,

    /// Root directory of the tier; merge keys are derived relative to it.
    pub root: PathBuf,

    /// Directory actually scanned for files.
    ///
    /// For the base tier this is the asset subtree (e.g. `Data/textures`);
    /// mods are scanned from their root since nesting depth varies.
    pub scan_root: PathBuf,

    /// Human-readable label (mod name, or "base").
    pub label: String,
}

impl Tier {
    /// Create the base tier, restricted to the asset subtree of `root`.
    ///
    /// The subtree is located case-insensitively (`Textures/` matches
    /// `textures`). When no such directory exists the lower-case name is
    /// kept so the enumerator can report it as missing.
    pub fn base(root: impl Into<PathBuf>, asset_dir: &str) -> Self {
        let root = root.into();
        let scan_root = find_child_dir_ignore_case(&root, asset_dir)
            .unwrap_or_else(|| root.join(asset_dir));

        Self {
            priority: BASE_PRIORITY,
            root,
            scan_root,
            label: "base".to_string(),
        }
    }

    /// Create a mod tier scanned from its root.
    pub fn overlay(priority: u32, label: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            priority,
            scan_root: root.clone(),
            root,
            label: label.into(),
        }
    }

    /// Whether this is the base tier.
    pub fn is_base(&self) -> bool {
        self.priority == BASE_PRIORITY
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier {} ({})", self.priority, self.label)
    }
}

/// A file contributed by a tier.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Absolute path of the source file.
    pub path: PathBuf,

    /// Tier that contributed the file.
    pub tier: Arc<Tier>,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>, tier: Arc<Tier>) -> Self {
        Self {
            path: path.into(),
            tier,
        }
    }
}

fn find_child_dir_ignore_case(parent: &Path, name: &str) -> Option<PathBuf> {
    let exact = parent.join(name);
    if exact.is_dir() {
        return Some(exact);
    }

    std::fs::read_dir(parent)
        .ok()?
        .filter_map(|entry| entry.ok())
        .find(|entry| {
            entry.file_name().to_string_lossy().eq_ignore_ascii_case(name)
                && entry.path().is_dir()
        })
        .map(|entry| entry.path())
}
