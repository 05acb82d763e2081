//! Mod order manifests.
//!
//! A manifest is an ordered table of mods. Row order is priority order:
//! the first active row becomes tier 1, the next tier 2, and so on, with
//! later rows overriding earlier ones. Rows are never re-sorted.
//!
//! # Formats
//!
//! - **JSON**: an array of `{"index", "name", "active", "path"}` objects.
//! - **Mod list**: the `modlist.txt` load-order file written by common mod
//!   managers (see [`modlist`]).
//!
//! # Example
//!
//! ```ignore
//! use texmerge::manifest::{ManifestFormat, ModOrderManifest};
//!
//! let manifest = ModOrderManifest::load(Path::new("load_order.json"), &ManifestFormat::Json)?;
//! for row in manifest.active_rows() {
//!     println!("{} -> {}", row.name, row.path.display());
//! }
//! ```

mod modlist;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use modlist::parse_modlist;

/// Errors that can occur while loading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read mod order manifest {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    /// The manifest content is malformed.
    #[error("failed to parse mod order manifest {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// A single line of a text manifest is malformed.
    #[error("invalid entry in mod order manifest {} at line {line}: {reason}", path.display())]
    InvalidLine {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// How a manifest file is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestFormat {
    /// JSON array of rows.
    Json,

    /// `modlist.txt` load order; mod folders live under `mods_dir`.
    ModList { mods_dir: PathBuf },
}

impl ManifestFormat {
    /// Short name used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            ManifestFormat::Json => "json",
            ManifestFormat::ModList { .. } => "modlist",
        }
    }
}

/// One row of a mod order manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRow {
    /// Position reported by the source (informational only).
    #[serde(default)]
    pub index: usize,

    /// Display name of the mod.
    pub name: String,

    /// Inactive rows are skipped when building tiers.
    #[serde(default = "default_active")]
    pub active: bool,

    /// Root directory of the mod.
    pub path: PathBuf,
}

fn default_active() -> bool {
    true
}

/// Ordered table of mods, lowest priority first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModOrderManifest {
    rows: Vec<ManifestRow>,
}

impl ModOrderManifest {
    /// Create a manifest from rows already in increasing priority order.
    pub fn new(rows: Vec<ManifestRow>) -> Self {
        Self { rows }
    }

    /// Load a manifest from disk.
    pub fn load(path: &Path, format: &ManifestFormat) -> ManifestResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        match format {
            ManifestFormat::Json => Self::from_json(path, &content),
            ManifestFormat::ModList { mods_dir } => parse_modlist(path, &content, mods_dir),
        }
    }

    /// Parse JSON manifest content read from `path`.
    ///
    /// A missing `index` defaults to the 1-based row position; relative mod
    /// paths are taken relative to the manifest's directory.
    pub fn from_json(path: &Path, content: &str) -> ManifestResult<Self> {
        let mut rows: Vec<ManifestRow> =
            serde_json::from_str(content).map_err(|e| ManifestError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        for (position, row) in rows.iter_mut().enumerate() {
            if row.name.trim().is_empty() {
                return Err(ManifestError::Parse {
                    path: path.to_path_buf(),
                    reason: format!("row {} has an empty name", position + 1),
                });
            }
            if row.index == 0 {
                row.index = position + 1;
            }
            if row.path.is_relative() {
                row.path = base_dir.join(&row.path);
            }
        }

        Ok(Self { rows })
    }

    /// Serialize the manifest as pretty-printed JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.rows).unwrap_or_else(|_| "[]".to_string())
    }

    /// All rows in priority order.
    pub fn rows(&self) -> &[ManifestRow] {
        &self.rows
    }

    /// Active rows in priority order.
    pub fn active_rows(&self) -> impl Iterator<Item = &ManifestRow> {
        self.rows.iter().filter(|row| row.active)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(index: usize, name: &str, active: bool, path: &str) -> ManifestRow {
        ManifestRow {
            index,
            name: name.to_string(),
            active,
            path: PathBuf::from(path),
        }
    }

    #[test]
    fn test_from_json_keeps_row_order() {
        let json = r#"[
            {"index": 7, "name": "Zeta", "active": true, "path": "/mods/Zeta"},
            {"index": 2, "name": "Alpha", "active": false, "path": "/mods/Alpha"},
            {"index": 5, "name": "Mid", "path": "/mods/Mid"}
        ]"#;

        let manifest = ModOrderManifest::from_json(Path::new("/cfg/order.json"), json).unwrap();
        let names: Vec<_> = manifest.rows().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(manifest.rows()[0].index, 7);

        let active: Vec<_> = manifest.active_rows().map(|r| r.name.as_str()).collect();
        assert_eq!(active, vec!["Zeta", "Mid"]);
    }

    #[test]
    fn test_from_json_defaults() {
        let json = r#"[{"name": "A", "path": "mods/A"}, {"name": "B", "path": "/abs/B"}]"#;
        let manifest = ModOrderManifest::from_json(Path::new("/cfg/order.json"), json).unwrap();

        assert_eq!(manifest.rows()[0].index, 1);
        assert_eq!(manifest.rows()[1].index, 2);
        assert!(manifest.rows()[0].active);
        assert_eq!(manifest.rows()[0].path, PathBuf::from("/cfg/mods/A"));
        assert_eq!(manifest.rows()[1].path, PathBuf::from("/abs/B"));
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        let err = ModOrderManifest::from_json(Path::new("/cfg/order.json"), "{not json").unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }));
        assert!(err.to_string().contains("/cfg/order.json"));
    }

    #[test]
    fn test_from_json_rejects_empty_name() {
        let json = r#"[{"name": "  ", "path": "/mods/x"}]"#;
        let err = ModOrderManifest::from_json(Path::new("order.json"), json).unwrap_err();
        assert!(err.to_string().contains("row 1 has an empty name"));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.json");

        let err = ModOrderManifest::load(&path, &ManifestFormat::Json).unwrap_err();
        assert!(matches!(err, ManifestError::Read { .. }));
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let temp = TempDir::new().unwrap();
        let manifest = ModOrderManifest::new(vec![
            row(1, "A", true, "/mods/A"),
            row(2, "B", false, "/mods/B"),
        ]);
        let path = temp.path().join("order.json");
        std::fs::write(&path, manifest.to_json()).unwrap();

        let loaded = ModOrderManifest::load(&path, &ManifestFormat::Json).unwrap();
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.len(), 2);
        assert!(!loaded.is_empty());
    }

    #[test]
    fn test_format_names() {
        assert_eq!(ManifestFormat::Json.name(), "json");
        assert_eq!(
            ManifestFormat::ModList {
                mods_dir: PathBuf::from("/mods")
            }
            .name(),
            "modlist"
        );
    }
}
