use std::path::Path;

use serde::{Deserialize, Serialize};

/// Processing stage of a frame, in canonical chain order.
///
/// The stage a file has reached is encoded in its name by a suffix that
/// grows with every stage (`M51_001_c_cc_r.fit` is registered).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    Raw,
    Calibrated,
    Cosmetized,
    Registered,
    Normalized,
    Approved,
}

/// Suffix table, longest first. Classification walks it in this order so a
/// `_c_cc_r` name can never be taken for `_c`.
const STAGE_SUFFIXES: [(PipelineStage, &str); 5] = [
    (PipelineStage::Approved, "_c_cc_r_n_a"),
    (PipelineStage::Normalized, "_c_cc_r_n"),
    (PipelineStage::Registered, "_c_cc_r"),
    (PipelineStage::Cosmetized, "_c_cc"),
    (PipelineStage::Calibrated, "_c"),
];

impl PipelineStage {
    /// All stages in canonical order.
    pub const ALL: [PipelineStage; 6] = [
        Self::Raw,
        Self::Calibrated,
        Self::Cosmetized,
        Self::Registered,
        Self::Normalized,
        Self::Approved,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical filename suffix (empty for raw frames).
    pub fn suffix(self) -> &'static str {
        STAGE_SUFFIXES
            .iter()
            .find(|(stage, _)| *stage == self)
            .map(|(_, suffix)| *suffix)
            .unwrap_or("")
    }

    /// Inverse of [`PipelineStage::suffix`].
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        if suffix.is_empty() {
            return Some(Self::Raw);
        }
        STAGE_SUFFIXES
            .iter()
            .find(|(_, s)| *s == suffix)
            .map(|(stage, _)| *stage)
    }

    /// Name of the output subfolder this stage writes into.
    pub fn stage_dir(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Calibrated => "calibrated",
            Self::Cosmetized => "cosmetized",
            Self::Registered => "registered",
            Self::Normalized => "normalized",
            Self::Approved => "approved",
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw => write!(f, "Raw"),
            Self::Calibrated => write!(f, "Calibrated"),
            Self::Cosmetized => write!(f, "Cosmetized"),
            Self::Registered => write!(f, "Registered"),
            Self::Normalized => write!(f, "Normalized"),
            Self::Approved => write!(f, "Approved"),
        }
    }
}

/// Identity of one logical exposure across all of its stage files:
/// the file stem with the stage suffix removed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameSignature(String);

impl FrameSignature {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FrameSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split a file name into `(stem, extension)` at the last dot.
fn split_name(path: &Path) -> (String, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.rfind('.') {
        Some(dot) if dot > 0 => (name[..dot].to_string(), name[dot + 1..].to_string()),
        _ => (name, String::new()),
    }
}

/// Derive `(signature, stage)` from a file name.
///
/// The name must read `<signature><suffix>.<ext>` with a non-empty signature;
/// anything else is a raw frame whose signature is the whole stem.
pub fn classify(path: &Path) -> (FrameSignature, PipelineStage) {
    let (stem, _) = split_name(path);
    for (stage, suffix) in STAGE_SUFFIXES {
        if stem.len() > suffix.len() && stem.ends_with(suffix) {
            let signature = &stem[..stem.len() - suffix.len()];
            return (FrameSignature::new(signature), stage);
        }
    }
    (FrameSignature::new(stem), PipelineStage::Raw)
}

/// Extension of `path` as written on disk (case preserved).
pub fn extension_of(path: &Path) -> String {
    split_name(path).1
}

/// Whether `path` carries one of `extensions` (case-insensitive).
pub fn is_image_file(path: &Path, extensions: &[String]) -> bool {
    let (_, ext) = split_name(path);
    !ext.is_empty() && extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
}

/// Build `<signature><suffix>.<ext>`.
pub fn stage_file_name(signature: &FrameSignature, stage: PipelineStage, ext: &str) -> String {
    if ext.is_empty() {
        format!("{}{}", signature, stage.suffix())
    } else {
        format!("{}{}.{}", signature, stage.suffix(), ext)
    }
}

/// File name `input` takes once it has been processed up to `stage`.
pub fn output_file_name(input: &Path, stage: PipelineStage) -> String {
    let (signature, _) = classify(input);
    stage_file_name(&signature, stage, &extension_of(input))
}
