use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::io::fits::{read_fits, write_fits, FitsHeader};

/// A single-plane image with the header it was read with.
/// Pixel values are physical ADU as f32.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<f32>,
    pub header: FitsHeader,
}

impl Frame {
    pub fn new(data: Array2<f32>, header: FitsHeader) -> Self {
        Self { data, header }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let (data, header) = read_fits(path)?;
        Ok(Self { data, header })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_fits(path, &self.data, &self.header)
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }
}

/// Colour filter array layout of a one-shot-colour sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum BayerPattern {
    RGGB,
    GRBG,
    GBRG,
    BGGR,
}

impl BayerPattern {
    /// Parse a `BAYERPAT` header value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RGGB" => Some(Self::RGGB),
            "GRBG" => Some(Self::GRBG),
            "GBRG" => Some(Self::GBRG),
            "BGGR" => Some(Self::BGGR),
            _ => None,
        }
    }

    /// Offset `(row, col)` of the red photosite inside the 2x2 cell.
    pub fn red_offset(self) -> (usize, usize) {
        match self {
            Self::RGGB => (0, 0),
            Self::GRBG => (0, 1),
            Self::GBRG => (1, 0),
            Self::BGGR => (1, 1),
        }
    }
}

impl std::fmt::Display for BayerPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RGGB => write!(f, "RGGB"),
            Self::GRBG => write!(f, "GRBG"),
            Self::GBRG => write!(f, "GBRG"),
            Self::BGGR => write!(f, "BGGR"),
        }
    }
}

/// Colour channel of a debayered frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Self::Red, Self::Green, Self::Blue];

    /// Tag inserted into channel frame names (`M51_001_R_c_cc.fit`).
    pub fn tag(self) -> &'static str {
        match self {
            Self::Red => "R",
            Self::Green => "G",
            Self::Blue => "B",
        }
    }
}
