//! `modlist.txt` load-order parsing.
//!
//! ```text
//! # This file was automatically generated by Mod Organizer.
//! +Highest Priority Mod
//! -Disabled Mod
//! +Texture Pack_separator
//! *Unmanaged: DLC
//! +Lowest Priority Mod
//! ```
//!
//! The file lists the highest-priority mod first; rows are reversed so the
//! resulting manifest runs from lowest to highest priority. Unmanaged
//! entries (`*`) and separators (`…_separator`) contribute no files and are
//! dropped.

use std::path::Path;

use tracing::debug;

use super::{ManifestError, ManifestResult, ManifestRow, ModOrderManifest};

const SEPARATOR_SUFFIX: &str = "_separator";

/// Parse `modlist.txt` content read from `path`.
pub fn parse_modlist(path: &Path, content: &str, mods_dir: &Path) -> ManifestResult<ModOrderManifest> {
    let mut rows = Vec::new();

    for (line_index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut chars = line.chars();
        let marker = chars.next();
        let name = chars.as_str().trim();

        let active = match marker {
            Some('+') => true,
            Some('-') => false,
            Some('*') => {
                debug!(entry = name, "Skipping unmanaged load order entry");
                continue;
            }
            _ => {
                return Err(ManifestError::InvalidLine {
                    path: path.to_path_buf(),
                    line: line_index + 1,
                    reason: format!("expected '+', '-' or '*' prefix, found {:?}", line),
                })
            }
        };

        if name.is_empty() {
            return Err(ManifestError::InvalidLine {
                path: path.to_path_buf(),
                line: line_index + 1,
                reason: "mod name is empty".to_string(),
            });
        }

        if name.ends_with(SEPARATOR_SUFFIX) {
            continue;
        }

        rows.push(ManifestRow {
            index: 0,
            name: name.to_string(),
            active,
            path: mods_dir.join(name),
        });
    }

    rows.reverse();
    for (position, row) in rows.iter_mut().enumerate() {
        row.index = position + 1;
    }

    Ok(ModOrderManifest::new(rows))
}
