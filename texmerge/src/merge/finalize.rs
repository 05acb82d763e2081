//! Output tree finalization.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

/// Remove empty directories below `root`, deepest first.
///
/// Directories that only contain empty directories are removed too. `root`
/// itself is kept. Returns the number of directories removed; a missing
/// root removes nothing.
pub fn prune_empty_dirs(root: &Path) -> io::Result<usize> {
    if !root.is_dir() {
        return Ok(0);
    }

    let mut removed = 0;

    for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry while pruning output");
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        match is_empty_dir(path) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read directory while pruning output"
                );
                continue;
            }
        }

        match fs::remove_dir(path) {
            Ok(()) => {
                debug!(path = %path.display(), "Removed empty directory");
                removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove empty directory");
            }
        }
    }

    Ok(removed)
}

/// Number of regular files below `root`, the distinct output count.
pub fn count_files(root: &Path) -> usize {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}

fn is_empty_dir(path: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(path)?.next().is_none())
}
