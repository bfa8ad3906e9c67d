use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::consts::DEFAULT_FRAME_EXTENSIONS;
use crate::error::{Result, SaturnError};
use crate::stage::is_image_file;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Directories whose name starts with one of these are never entered.
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,
    /// Frame file extensions, compared case-insensitively.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub follow_links: bool,
}

fn default_skip_prefixes() -> Vec<String> {
    vec!["_".into()]
}

fn default_extensions() -> Vec<String> {
    DEFAULT_FRAME_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            skip_prefixes: default_skip_prefixes(),
            extensions: default_extensions(),
            follow_links: false,
        }
    }
}

/// Whether the walk must not descend into `entry`. The root itself is
/// always entered.
fn is_pruned(entry: &DirEntry, skip_prefixes: &[String]) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    skip_prefixes
        .iter()
        .any(|p| !p.is_empty() && name.starts_with(p.as_str()))
}

/// Depth-first walk of `root` returning every frame file outside pruned
/// subtrees. Unreadable entries are logged and skipped.
pub fn scan_frames(root: &Path, config: &ScanConfig) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(SaturnError::DirectoryMissing(root.to_path_buf()));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(config.follow_links)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let pruned = is_pruned(e, &config.skip_prefixes);
            if pruned {
                debug!(dir = %e.path().display(), "Skipping prefixed directory");
            }
            !pruned
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "Skipping unreadable directory entry");
                continue;
            }
        };
        if entry.file_type().is_file() && is_image_file(entry.path(), &config.extensions) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_extensions_cover_fits_spellings() {
        let cfg = ScanConfig::default();
        assert!(is_image_file(Path::new("a.FIT"), &cfg.extensions));
        assert!(is_image_file(Path::new("a.fits"), &cfg.extensions));
        assert!(is_image_file(Path::new("a.fts"), &cfg.extensions));
        assert!(!is_image_file(Path::new("a.xisf"), &cfg.extensions));
    }
}
