use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SaturnError};
use crate::stage::is_image_file;

use super::list_entries;
use super::tokens::{parse_exposure, FilterAliases};

/// Naming of the reference library.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceLayout {
    /// Subfolder holding registration references; `None` or empty searches the root.
    pub registration_dir: Option<String>,
    /// Subfolder holding normalization references; `None` or empty searches the root.
    pub normalization_dir: Option<String>,
    /// Separator between the object name and the rest of a reference name.
    pub separator: String,
    /// Normalization references must also carry the frame exposure.
    pub strict_exposure: bool,
}

impl Default for ReferenceLayout {
    fn default() -> Self {
        Self {
            registration_dir: Some("registration".into()),
            normalization_dir: Some("normalization".into()),
            separator: "_".into(),
            strict_exposure: false,
        }
    }
}

/// Filename-pattern lookup of registration and normalization references.
///
/// When several files match, the last one enumerated wins. This is not a
/// quality ranking.
pub struct ReferenceResolver<'a> {
    pub library: &'a Path,
    pub layout: &'a ReferenceLayout,
    pub aliases: &'a FilterAliases,
    pub extensions: &'a [String],
}

impl ReferenceResolver<'_> {
    pub fn registration(&self, object: &str) -> Result<PathBuf> {
        let dir = subdir(self.library, self.layout.registration_dir.as_deref());
        let prefix = format!("{}{}", object, self.layout.separator);
        let found = self.last_match(&dir, |name| name.starts_with(&prefix))?;
        found.ok_or_else(|| SaturnError::ReferenceNotFound {
            purpose: "registration".into(),
            object: object.to_string(),
        })
    }

    pub fn normalization(&self, object: &str, filter: &str, exposure: f64) -> Result<PathBuf> {
        let dir = subdir(self.library, self.layout.normalization_dir.as_deref());
        let prefix = format!("{}{}", object, self.layout.separator);
        let found = self.last_match(&dir, |name| {
            if !name.starts_with(&prefix) {
                return false;
            }
            let rest = &name[prefix.len()..];
            if !self.aliases.name_has_filter(rest, filter) {
                return false;
            }
            !self.layout.strict_exposure
                || parse_exposure(rest).is_some_and(|e| (e - exposure).abs() < 1e-3)
        })?;
        found.ok_or_else(|| SaturnError::ReferenceNotFound {
            purpose: "normalization".into(),
            object: object.to_string(),
        })
    }

    fn last_match(&self, dir: &Path, matches: impl Fn(&str) -> bool) -> Result<Option<PathBuf>> {
        let mut found: Option<PathBuf> = None;
        for entry in list_entries(dir)? {
            if entry.is_dir || !is_image_file(&entry.path, self.extensions) {
                continue;
            }
            if matches(&entry.name) {
                if let Some(previous) = &found {
                    debug!(
                        replaced = %previous.display(),
                        by = %entry.path.display(),
                        "Several references match; last enumerated wins"
                    );
                }
                found = Some(entry.path);
            }
        }
        Ok(found)
    }
}

fn subdir(root: &Path, dir: Option<&str>) -> PathBuf {
    match dir {
        Some(d) if !d.is_empty() => root.join(d),
        _ => root.to_path_buf(),
    }
}

/// Registration reference for `object`. Convenience wrapper over
/// [`ReferenceResolver::registration`].
pub fn find_registration_reference(
    library: &Path,
    layout: &ReferenceLayout,
    aliases: &FilterAliases,
    object: &str,
    extensions: &[String],
) -> Result<PathBuf> {
    ReferenceResolver {
        library,
        layout,
        aliases,
        extensions,
    }
    .registration(object)
}

/// Normalization reference for `object` shot through `filter`.
pub fn find_normalization_reference(
    library: &Path,
    layout: &ReferenceLayout,
    aliases: &FilterAliases,
    object: &str,
    filter: &str,
    exposure: f64,
    extensions: &[String],
) -> Result<PathBuf> {
    ReferenceResolver {
        library,
        layout,
        aliases,
        extensions,
    }
    .normalization(object, filter, exposure)
}
