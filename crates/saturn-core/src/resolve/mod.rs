pub mod master;
pub mod reference;
pub mod tokens;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SaturnError};

pub use master::{resolve_masters, DateMatch, MasterFrameSet, MasterLayout, MasterResolver, MatchTolerances};
pub use reference::{
    find_normalization_reference, find_registration_reference, ReferenceLayout, ReferenceResolver,
};
pub use tokens::FilterAliases;

/// One directory entry, in the order the filesystem returned it.
#[derive(Clone, Debug)]
pub struct DirEntryInfo {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
}

/// List `dir` without sorting. Enumeration order is platform-defined and
/// decides ties in every resolver.
pub(crate) fn list_entries(dir: &Path) -> Result<Vec<DirEntryInfo>> {
    if !dir.is_dir() {
        return Err(SaturnError::DirectoryMissing(dir.to_path_buf()));
    }
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        entries.push(DirEntryInfo {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir: path.is_dir(),
            path,
        });
    }
    Ok(entries)
}
