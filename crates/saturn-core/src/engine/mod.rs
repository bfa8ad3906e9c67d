pub mod align;
pub mod cosmetic;
pub mod debayer;
pub mod native;
pub mod stats;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_COSMETIC_SIGMA;
use crate::error::Result;
use crate::frame::{BayerPattern, Channel};
use crate::resolve::MasterFrameSet;

pub use native::NativeEngine;

/// Defect-correction settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CosmeticParams {
    /// Deviation from the local median, in robust sigmas, that marks a defect.
    pub sigma: f32,
    pub hot: bool,
    pub cold: bool,
}

impl Default for CosmeticParams {
    fn default() -> Self {
        Self {
            sigma: DEFAULT_COSMETIC_SIGMA,
            hot: true,
            cold: true,
        }
    }
}

/// Pixel work behind every pipeline stage.
///
/// Each operation reads `target`, writes its result to the given output
/// path(s) and returns what it wrote. The orchestrator never touches pixels
/// itself, so any implementation that honours these paths can be plugged in.
pub trait ImageEngine {
    /// Human-readable engine name for logs.
    fn name(&self) -> &str;

    fn calibrate(
        &self,
        target: &Path,
        masters: &MasterFrameSet,
        frame_exposure: f64,
        output: &Path,
    ) -> Result<PathBuf>;

    fn cosmetic_correct(
        &self,
        target: &Path,
        params: &CosmeticParams,
        output: &Path,
    ) -> Result<PathBuf>;

    /// Split a colour-filter-array frame into one frame per channel.
    fn debayer(
        &self,
        target: &Path,
        pattern: BayerPattern,
        outputs: &[(Channel, PathBuf)],
    ) -> Result<Vec<PathBuf>>;

    fn register(&self, target: &Path, reference: &Path, output: &Path) -> Result<PathBuf>;

    fn normalize(&self, target: &Path, reference: &Path, output: &Path) -> Result<PathBuf>;
}
