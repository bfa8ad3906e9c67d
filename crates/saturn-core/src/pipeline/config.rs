use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_ROOT_SUBFOLDER;
use crate::engine::CosmeticParams;
use crate::error::{Result, SaturnError};
use crate::output::{OutputRoots, PathMode};
use crate::resolve::{FilterAliases, MasterLayout, MatchTolerances, ReferenceLayout};
use crate::scan::ScanConfig;
use crate::stage::PipelineStage;

/// Which stages a run executes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageToggles {
    pub calibrate: bool,
    pub cosmetic: bool,
    /// Split colour-filter-array frames into channels after cosmetic correction.
    pub debayer: bool,
    pub register: bool,
    pub normalize: bool,
    /// Approval never produces files; enabling it only logs a warning.
    pub approve: bool,
}

impl Default for StageToggles {
    fn default() -> Self {
        Self {
            calibrate: true,
            cosmetic: true,
            debayer: true,
            register: true,
            normalize: true,
            approve: false,
        }
    }
}

impl StageToggles {
    pub fn is_enabled(&self, stage: PipelineStage) -> bool {
        match stage {
            PipelineStage::Raw => false,
            PipelineStage::Calibrated => self.calibrate,
            PipelineStage::Cosmetized => self.cosmetic,
            PipelineStage::Registered => self.register,
            PipelineStage::Normalized => self.normalize,
            PipelineStage::Approved => self.approve,
        }
    }

    /// Enabled stages that write files, in canonical order.
    pub fn producing(&self) -> Vec<PipelineStage> {
        PipelineStage::ALL
            .into_iter()
            .filter(|&s| s != PipelineStage::Approved && self.is_enabled(s))
            .collect()
    }

    /// Last enabled stage that writes files.
    pub fn terminal(&self) -> Option<PipelineStage> {
        self.producing().last().copied()
    }
}

/// Complete settings of one pipeline run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub input_root: PathBuf,
    /// Root for object and root-subfolder layouts; the input root when unset.
    pub output_root: Option<PathBuf>,
    pub master_library: Option<PathBuf>,
    pub reference_library: Option<PathBuf>,
    pub stages: StageToggles,
    pub path_mode: PathMode,
    pub root_subfolder: String,
    /// Reuse outputs already on disk instead of recomputing them.
    pub skip_existing: bool,
    /// Regenerate outputs that already exist. Ignored when `skip_existing` is set.
    pub overwrite: bool,
    /// Run the second pass that fills stage gaps.
    pub backfill: bool,
    pub tolerances: MatchTolerances,
    pub scan: ScanConfig,
    pub masters: MasterLayout,
    pub references: ReferenceLayout,
    pub filter_aliases: FilterAliases,
    pub cosmetic: CosmeticParams,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_root: PathBuf::from("."),
            output_root: None,
            master_library: None,
            reference_library: None,
            stages: StageToggles::default(),
            path_mode: PathMode::default(),
            root_subfolder: DEFAULT_ROOT_SUBFOLDER.into(),
            skip_existing: true,
            overwrite: false,
            backfill: true,
            tolerances: MatchTolerances::default(),
            scan: ScanConfig::default(),
            masters: MasterLayout::default(),
            references: ReferenceLayout::default(),
            filter_aliases: FilterAliases::default(),
            cosmetic: CosmeticParams::default(),
        }
    }
}

impl RunConfig {
    pub fn new(input_root: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            ..Self::default()
        }
    }

    /// Reject settings that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        if self.path_mode == PathMode::Absolute && self.output_root.is_none() {
            return Err(SaturnError::Config(
                "path_mode = Absolute requires output_root".into(),
            ));
        }
        if self.stages.calibrate && self.master_library.is_none() {
            return Err(SaturnError::Config(
                "calibration is enabled but master_library is not set".into(),
            ));
        }
        if (self.stages.register || self.stages.normalize) && self.reference_library.is_none() {
            return Err(SaturnError::Config(
                "registration or normalization is enabled but reference_library is not set"
                    .into(),
            ));
        }
        if self.root_subfolder.trim().is_empty()
            && matches!(self.path_mode, PathMode::Auto | PathMode::PutInRootSubfolder)
        {
            return Err(SaturnError::Config("root_subfolder must not be empty".into()));
        }
        if self.scan.extensions.is_empty() {
            return Err(SaturnError::Config("scan.extensions must not be empty".into()));
        }
        if !(self.cosmetic.sigma > 0.0) {
            return Err(SaturnError::Config(format!(
                "cosmetic.sigma must be positive, got {}",
                self.cosmetic.sigma
            )));
        }
        if self.tolerances.exposure < 0.0 {
            return Err(SaturnError::Config(format!(
                "tolerances.exposure must not be negative, got {}",
                self.tolerances.exposure
            )));
        }
        Ok(())
    }

    pub fn output_roots(&self) -> OutputRoots<'_> {
        OutputRoots {
            scan_root: &self.input_root,
            output_root: self.output_root.as_deref(),
            root_subfolder: &self.root_subfolder,
        }
    }

    /// Output root that Pass 1 does not already cover.
    pub fn separate_output_root(&self) -> Option<&Path> {
        self.output_root
            .as_deref()
            .filter(|out| !out.starts_with(&self.input_root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_skips_inert_approval() {
        let toggles = StageToggles {
            approve: true,
            normalize: false,
            ..StageToggles::default()
        };
        assert_eq!(toggles.terminal(), Some(PipelineStage::Registered));
        assert!(!toggles.producing().contains(&PipelineStage::Approved));
    }

    #[test]
    fn absolute_without_output_root_is_rejected() {
        let config = RunConfig {
            path_mode: PathMode::Absolute,
            master_library: Some("/lib".into()),
            reference_library: Some("/refs".into()),
            ..RunConfig::new("/data")
        };
        assert!(matches!(config.validate(), Err(SaturnError::Config(_))));
    }

    #[test]
    fn output_root_inside_input_is_not_separate() {
        let config = RunConfig {
            output_root: Some("/data/out".into()),
            ..RunConfig::new("/data")
        };
        assert_eq!(config.separate_output_root(), None);
        let config = RunConfig {
            output_root: Some("/elsewhere".into()),
            ..RunConfig::new("/data")
        };
        assert_eq!(config.separate_output_root(), Some(Path::new("/elsewhere")));
    }
}
