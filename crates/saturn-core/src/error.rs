use std::path::PathBuf;

use thiserror::Error;

use crate::stage::PipelineStage;

/// Master frame kind, used to name which part of a calibration set failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MasterKind {
    Bias,
    Dark,
    Flat,
}

impl std::fmt::Display for MasterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bias => write!(f, "bias"),
            Self::Dark => write!(f, "dark"),
            Self::Flat => write!(f, "flat"),
        }
    }
}

/// Search axis on which a master frame lookup gave up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchAxis {
    Temperature,
    Date,
    Exposure,
    Filter,
    Binning,
}

impl std::fmt::Display for MatchAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Temperature => write!(f, "temperature"),
            Self::Date => write!(f, "date"),
            Self::Exposure => write!(f, "exposure"),
            Self::Filter => write!(f, "filter"),
            Self::Binning => write!(f, "binning"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SaturnError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Required header keyword {keyword} missing in {}", path.display())]
    MetadataMissing { path: PathBuf, keyword: String },

    #[error("No {kind} master matched on {axis} under {}", root.display())]
    MasterNotFound {
        kind: MasterKind,
        axis: MatchAxis,
        root: PathBuf,
    },

    #[error("No {purpose} reference for object {object}")]
    ReferenceNotFound { purpose: String, object: String },

    #[error("Directory does not exist: {}", .0.display())]
    DirectoryMissing(PathBuf),

    #[error("Cannot backfill {stage} for {signature}: {reason}")]
    Unclassifiable {
        signature: String,
        stage: PipelineStage,
        reason: String,
    },

    #[error("Invalid FITS file: {0}")]
    InvalidFits(String),

    #[error("Unsupported BITPIX: {0}")]
    UnsupportedBitpix(i64),

    #[error("Image size mismatch: {expected_w}x{expected_h} vs {actual_w}x{actual_h}")]
    DimensionMismatch {
        expected_w: usize,
        expected_h: usize,
        actual_w: usize,
        actual_h: usize,
    },

    #[error("Output already exists: {}", .0.display())]
    OutputExists(PathBuf),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SaturnError>;
