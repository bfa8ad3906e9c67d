use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::DEFAULT_EXPOSURE_TOLERANCE;
use crate::error::{MasterKind, MatchAxis, Result, SaturnError};
use crate::metadata::FrameMetadata;

use super::tokens::{parse_binning, parse_date, parse_exposure, parse_temperature, FilterAliases};
use super::{list_entries, DirEntryInfo};

/// Directory naming of a master library.
///
/// ```text
/// <library>/<bias_dir>/[<instrument>/]<temperature pack>/[<date pack>/]files
/// <library>/<dark_dir>/[<instrument>/]<temperature pack>/[<date pack>/]files
/// <library>/<flat_dir>/[<instrument>/][<date pack>/]files
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterLayout {
    pub bias_dir: String,
    pub dark_dir: String,
    pub flat_dir: String,
    /// Libraries of the older layout keep all cameras in one tree.
    pub instrument_subfolder: bool,
}

impl Default for MasterLayout {
    fn default() -> Self {
        Self {
            bias_dir: "Bias".into(),
            dark_dir: "Darks".into(),
            flat_dir: "Flats".into(),
            instrument_subfolder: true,
        }
    }
}

/// How a date pack is chosen relative to the frame's observation date.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateMatch {
    /// Nearest pack not later than the frame.
    #[default]
    NotLater,
    /// Same as `NotLater`, falling back to the nearest later pack.
    Nearest,
}

impl std::fmt::Display for DateMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotLater => write!(f, "Not Later"),
            Self::Nearest => write!(f, "Nearest"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchTolerances {
    /// A dark qualifies when `dark_exposure + exposure >= frame_exposure`.
    #[serde(default = "default_exposure_tolerance")]
    pub exposure: f64,
    /// Reject temperature packs further than this from the frame (°C).
    #[serde(default)]
    pub max_temperature_delta: Option<i32>,
    #[serde(default)]
    pub date_match: DateMatch,
}

fn default_exposure_tolerance() -> f64 {
    DEFAULT_EXPOSURE_TOLERANCE
}

impl Default for MatchTolerances {
    fn default() -> Self {
        Self {
            exposure: DEFAULT_EXPOSURE_TOLERANCE,
            max_temperature_delta: None,
            date_match: DateMatch::default(),
        }
    }
}

/// Calibration masters for one frame. Only ever built complete.
#[derive(Clone, Debug, PartialEq)]
pub struct MasterFrameSet {
    pub bias: PathBuf,
    pub dark: PathBuf,
    pub flat: PathBuf,
    /// Exposure of the chosen dark in seconds.
    pub dark_exposure: f64,
}

/// Nearest-match search over a master library.
///
/// Ties on equal distance keep the first directory entry in filesystem
/// enumeration order, which differs between platforms.
pub struct MasterResolver<'a> {
    pub library: &'a Path,
    pub layout: &'a MasterLayout,
    pub tolerances: &'a MatchTolerances,
    pub aliases: &'a FilterAliases,
    pub extensions: &'a [String],
}

impl MasterResolver<'_> {
    /// Resolve bias, dark and flat for `meta`. Fails as a whole if any one
    /// of them cannot be found.
    pub fn resolve(&self, meta: &FrameMetadata) -> Result<MasterFrameSet> {
        if !self.library.is_dir() {
            return Err(SaturnError::DirectoryMissing(self.library.to_path_buf()));
        }
        let bias = self.resolve_bias(meta)?;
        let (dark, dark_exposure) = self.resolve_dark(meta)?;
        let flat = self.resolve_flat(meta)?;
        debug!(
            bias = %bias.display(),
            dark = %dark.display(),
            flat = %flat.display(),
            "Resolved master frames"
        );
        Ok(MasterFrameSet {
            bias,
            dark,
            flat,
            dark_exposure,
        })
    }

    /// Root of one master kind, qualified by instrument when configured.
    pub fn kind_root(&self, kind: MasterKind, meta: &FrameMetadata) -> PathBuf {
        let dir = match kind {
            MasterKind::Bias => &self.layout.bias_dir,
            MasterKind::Dark => &self.layout.dark_dir,
            MasterKind::Flat => &self.layout.flat_dir,
        };
        let root = self.library.join(dir);
        if self.layout.instrument_subfolder {
            root.join(&meta.instrument)
        } else {
            root
        }
    }

    pub fn resolve_bias(&self, meta: &FrameMetadata) -> Result<PathBuf> {
        let root = self.kind_root(MasterKind::Bias, meta);
        let dir = self.temperature_then_date(MasterKind::Bias, &root, meta)?;
        let files = self.image_files(&dir)?;
        files
            .into_iter()
            .find(|f| parse_binning(&f.name) == Some(meta.binning))
            .map(|f| f.path)
            .ok_or_else(|| not_found(MasterKind::Bias, MatchAxis::Binning, &dir))
    }

    pub fn resolve_dark(&self, meta: &FrameMetadata) -> Result<(PathBuf, f64)> {
        let root = self.kind_root(MasterKind::Dark, meta);
        let dir = self.temperature_then_date(MasterKind::Dark, &root, meta)?;
        let files = self.image_files(&dir)?;

        let binned: Vec<DirEntryInfo> = files
            .into_iter()
            .filter(|f| parse_binning(&f.name).map_or(true, |b| b == meta.binning))
            .collect();
        if binned.is_empty() {
            return Err(not_found(MasterKind::Dark, MatchAxis::Binning, &dir));
        }

        select_dark(&binned, meta.exposure, self.tolerances.exposure)
            .map(|(f, exp)| (f.path.clone(), exp))
            .ok_or_else(|| not_found(MasterKind::Dark, MatchAxis::Exposure, &dir))
    }

    pub fn resolve_flat(&self, meta: &FrameMetadata) -> Result<PathBuf> {
        let root = self.kind_root(MasterKind::Flat, meta);
        let dir = self.date_dir(MasterKind::Flat, &root, meta.date)?;
        let files = self.image_files(&dir)?;
        files
            .into_iter()
            .find(|f| self.aliases.name_has_filter(stem(&f.name), &meta.filter))
            .map(|f| f.path)
            .ok_or_else(|| not_found(MasterKind::Flat, MatchAxis::Filter, &dir))
    }

    fn temperature_then_date(
        &self,
        kind: MasterKind,
        root: &Path,
        meta: &FrameMetadata,
    ) -> Result<PathBuf> {
        let entries = list_entries(root)?;
        let packs: Vec<(i32, &DirEntryInfo)> = entries
            .iter()
            .filter(|e| e.is_dir)
            .filter_map(|e| parse_temperature(&e.name).map(|t| (t, e)))
            .collect();

        let (temp, pack) = nearest_by(&packs, |(t, _)| t.abs_diff(meta.temperature))
            .map(|(t, e)| (*t, *e))
            .ok_or_else(|| not_found(kind, MatchAxis::Temperature, root))?;
        if let Some(max) = self.tolerances.max_temperature_delta {
            if temp.abs_diff(meta.temperature) > max.unsigned_abs() {
                return Err(not_found(kind, MatchAxis::Temperature, root));
            }
        }
        debug!(%kind, frame_temp = meta.temperature, pack_temp = temp, "Temperature pack");
        self.date_dir(kind, &pack.path, meta.date)
    }

    /// Pick the date pack under `dir`, or `dir` itself when it has none.
    fn date_dir(&self, kind: MasterKind, dir: &Path, date: NaiveDate) -> Result<PathBuf> {
        let entries = list_entries(dir)?;
        let packs: Vec<(NaiveDate, &DirEntryInfo)> = entries
            .iter()
            .filter(|e| e.is_dir)
            .filter_map(|e| parse_date(&e.name).map(|d| (d, e)))
            .collect();
        if packs.is_empty() {
            return Ok(dir.to_path_buf());
        }

        let earlier: Vec<_> = packs.iter().filter(|(d, _)| *d <= date).cloned().collect();
        let chosen = nearest_by(&earlier, |(d, _)| (date - *d).num_days().unsigned_abs())
            .or_else(|| match self.tolerances.date_match {
                DateMatch::Nearest => {
                    nearest_by(&packs, |(d, _)| (*d - date).num_days().unsigned_abs())
                }
                DateMatch::NotLater => None,
            })
            .ok_or_else(|| not_found(kind, MatchAxis::Date, dir))?;
        debug!(%kind, frame_date = %date, pack_date = %chosen.0, "Date pack");
        Ok(chosen.1.path.clone())
    }

    fn image_files(&self, dir: &Path) -> Result<Vec<DirEntryInfo>> {
        Ok(list_entries(dir)?
            .into_iter()
            .filter(|e| !e.is_dir && crate::stage::is_image_file(&e.path, self.extensions))
            .collect())
    }
}

/// Resolve a complete master set. Convenience wrapper over [`MasterResolver`].
pub fn resolve_masters(
    library: &Path,
    meta: &FrameMetadata,
    layout: &MasterLayout,
    tolerances: &MatchTolerances,
    aliases: &FilterAliases,
    extensions: &[String],
) -> Result<MasterFrameSet> {
    MasterResolver {
        library,
        layout,
        tolerances,
        aliases,
        extensions,
    }
    .resolve(meta)
}

/// Dark selection: among darks long enough within tolerance, the one
/// closest to the frame exposure.
fn select_dark(
    files: &[DirEntryInfo],
    frame_exposure: f64,
    tolerance: f64,
) -> Option<(&DirEntryInfo, f64)> {
    let mut best: Option<(&DirEntryInfo, f64)> = None;
    for file in files {
        let Some(exposure) = parse_exposure(stem(&file.name)) else {
            continue;
        };
        if exposure + tolerance < frame_exposure {
            continue;
        }
        let diff = (exposure - frame_exposure).abs();
        if best.map_or(true, |(_, b)| diff < (b - frame_exposure).abs()) {
            best = Some((file, exposure));
        }
    }
    best
}

/// First element minimising `key`; later equal elements never replace it.
fn nearest_by<T, K: Ord>(items: &[T], key: impl Fn(&T) -> K) -> Option<&T> {
    let mut best: Option<(&T, K)> = None;
    for item in items {
        let k = key(item);
        let replace = match &best {
            Some((_, bk)) => {
                if k == *bk {
                    debug!("Equal-distance candidates; keeping first enumerated");
                }
                k < *bk
            }
            None => true,
        };
        if replace {
            best = Some((item, k));
        }
    }
    best.map(|(item, _)| item)
}

fn stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

fn not_found(kind: MasterKind, axis: MatchAxis, root: &Path) -> SaturnError {
    SaturnError::MasterNotFound {
        kind,
        axis,
        root: root.to_path_buf(),
    }
}
