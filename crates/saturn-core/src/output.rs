use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::DEBAYERED_DIR;
use crate::error::{Result, SaturnError};
use crate::stage::{output_file_name, PipelineStage};

/// Output directory layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathMode {
    /// Same as `PutInRootSubfolder`.
    #[default]
    Auto,
    /// Everything under one subfolder of the output (or scan) root.
    PutInRootSubfolder,
    /// Grouped by object under the output (or scan) root, input tree flattened.
    PutInObjectSubfolder,
    /// Directly under the configured output root.
    Absolute,
    /// Beside each input, preserving the input tree.
    Relative,
    /// Beside each input, inside an object folder.
    RelativeWithObjectFolder,
    /// Final stage grouped by object, intermediates beside each input.
    PutFinalsInObjectSubfolder,
}

impl std::fmt::Display for PathMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "Auto"),
            Self::PutInRootSubfolder => write!(f, "Root Subfolder"),
            Self::PutInObjectSubfolder => write!(f, "Object Subfolder"),
            Self::Absolute => write!(f, "Absolute"),
            Self::Relative => write!(f, "Relative"),
            Self::RelativeWithObjectFolder => write!(f, "Relative + Object Folder"),
            Self::PutFinalsInObjectSubfolder => write!(f, "Finals in Object Subfolder"),
        }
    }
}

/// Fixed roots the layout is computed against.
#[derive(Clone, Copy, Debug)]
pub struct OutputRoots<'a> {
    pub scan_root: &'a Path,
    pub output_root: Option<&'a Path>,
    pub root_subfolder: &'a str,
}

impl OutputRoots<'_> {
    fn base_root(&self) -> &Path {
        self.output_root.unwrap_or(self.scan_root)
    }
}

/// Destination directories for one frame, computed once per input.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputPlan {
    base: PathBuf,
    final_base: PathBuf,
    terminal: Option<PipelineStage>,
}

impl OutputPlan {
    /// Plan the outputs of the raw frame `input`.
    ///
    /// `terminal` is the last enabled stage; only `PutFinalsInObjectSubfolder`
    /// treats it differently.
    pub fn new(
        mode: PathMode,
        input: &Path,
        object: &str,
        roots: OutputRoots<'_>,
        terminal: Option<PipelineStage>,
    ) -> Result<Self> {
        let input_dir = input.parent().unwrap_or(Path::new("")).to_path_buf();
        Self::with_input_dir(mode, input_dir, object, roots, terminal)
    }

    /// Rebuild the plan of a frame from one of its stage outputs, for frames
    /// whose raw file is unknown.
    pub fn from_stage_output(
        mode: PathMode,
        output: &Path,
        stage: PipelineStage,
        object: &str,
        roots: OutputRoots<'_>,
        terminal: Option<PipelineStage>,
    ) -> Result<Self> {
        let parent = output.parent().unwrap_or(Path::new(""));
        let in_stage_dir = parent
            .file_name()
            .map(|n| n == stage.stage_dir() || n == DEBAYERED_DIR)
            .unwrap_or(false);
        let base = if in_stage_dir {
            parent.parent().unwrap_or(Path::new("")).to_path_buf()
        } else {
            parent.to_path_buf()
        };
        match mode {
            // the stripped directory already contains the object folder
            PathMode::Relative | PathMode::RelativeWithObjectFolder => Ok(Self {
                final_base: base.clone(),
                base,
                terminal,
            }),
            PathMode::PutFinalsInObjectSubfolder => Ok(Self {
                base,
                final_base: roots.base_root().join(folder_name(object)),
                terminal,
            }),
            _ => Self::with_input_dir(mode, base, object, roots, terminal),
        }
    }

    fn with_input_dir(
        mode: PathMode,
        input_dir: PathBuf,
        object: &str,
        roots: OutputRoots<'_>,
        terminal: Option<PipelineStage>,
    ) -> Result<Self> {
        let object_dir = folder_name(object);
        let base = match mode {
            PathMode::Auto | PathMode::PutInRootSubfolder => {
                roots.base_root().join(roots.root_subfolder)
            }
            PathMode::PutInObjectSubfolder => roots.base_root().join(&object_dir),
            PathMode::Absolute => roots
                .output_root
                .ok_or_else(|| {
                    SaturnError::Config("Absolute path mode needs an output root".into())
                })?
                .to_path_buf(),
            PathMode::Relative | PathMode::PutFinalsInObjectSubfolder => input_dir,
            PathMode::RelativeWithObjectFolder => input_dir.join(&object_dir),
        };
        let final_base = match mode {
            PathMode::PutFinalsInObjectSubfolder => roots.base_root().join(&object_dir),
            _ => base.clone(),
        };
        Ok(Self {
            base,
            final_base,
            terminal,
        })
    }

    /// Directory receiving the output of `stage`.
    pub fn dir_for(&self, stage: PipelineStage) -> PathBuf {
        let base = if Some(stage) == self.terminal {
            &self.final_base
        } else {
            &self.base
        };
        base.join(stage.stage_dir())
    }

    /// Directory receiving debayered channel frames.
    pub fn debayer_dir(&self) -> PathBuf {
        self.base.join(DEBAYERED_DIR)
    }

    /// Full path `input` takes once processed to `stage`.
    pub fn output_path(&self, stage: PipelineStage, input: &Path) -> PathBuf {
        self.dir_for(stage).join(output_file_name(input, stage))
    }
}

/// Output directory for `stage` of the raw frame `input`.
pub fn resolve_output_dir(
    stage: PipelineStage,
    input: &Path,
    object: &str,
    mode: PathMode,
    roots: OutputRoots<'_>,
    terminal: Option<PipelineStage>,
) -> Result<PathBuf> {
    Ok(OutputPlan::new(mode, input, object, roots, terminal)?.dir_for(stage))
}

/// Object name usable as a single path component.
fn folder_name(object: &str) -> String {
    let cleaned: String = object
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "unknown".into()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roots<'a>(scan: &'a Path, out: Option<&'a Path>) -> OutputRoots<'a> {
        OutputRoots {
            scan_root: scan,
            output_root: out,
            root_subfolder: "processed",
        }
    }

    const RAW: &str = "/data/lights/night1/M51_001.fit";

    #[test]
    fn auto_aliases_root_subfolder() {
        let r = roots(Path::new("/data/lights"), None);
        let auto = resolve_output_dir(
            PipelineStage::Calibrated,
            Path::new(RAW),
            "M51",
            PathMode::Auto,
            r,
            None,
        )
        .unwrap();
        let explicit = resolve_output_dir(
            PipelineStage::Calibrated,
            Path::new(RAW),
            "M51",
            PathMode::PutInRootSubfolder,
            r,
            None,
        )
        .unwrap();
        assert_eq!(auto, explicit);
        assert_eq!(auto, PathBuf::from("/data/lights/processed/calibrated"));
    }

    #[test]
    fn object_subfolder_flattens_input_tree() {
        let r = roots(Path::new("/data/lights"), Some(Path::new("/out")));
        let dir = resolve_output_dir(
            PipelineStage::Normalized,
            Path::new(RAW),
            "M51",
            PathMode::PutInObjectSubfolder,
            r,
            None,
        )
        .unwrap();
        assert_eq!(dir, PathBuf::from("/out/M51/normalized"));
    }

    #[test]
    fn relative_modes_follow_the_input() {
        let r = roots(Path::new("/data/lights"), Some(Path::new("/out")));
        let rel = OutputPlan::new(PathMode::Relative, Path::new(RAW), "M51", r, None).unwrap();
        assert_eq!(
            rel.dir_for(PipelineStage::Registered),
            PathBuf::from("/data/lights/night1/registered")
        );
        let obj = OutputPlan::new(
            PathMode::RelativeWithObjectFolder,
            Path::new(RAW),
            "M51",
            r,
            None,
        )
        .unwrap();
        assert_eq!(
            obj.dir_for(PipelineStage::Registered),
            PathBuf::from("/data/lights/night1/M51/registered")
        );
    }

    #[test]
    fn finals_only_terminal_stage_is_grouped() {
        let r = roots(Path::new("/data/lights"), Some(Path::new("/out")));
        let plan = OutputPlan::new(
            PathMode::PutFinalsInObjectSubfolder,
            Path::new(RAW),
            "M51",
            r,
            Some(PipelineStage::Normalized),
        )
        .unwrap();
        assert_eq!(
            plan.dir_for(PipelineStage::Calibrated),
            PathBuf::from("/data/lights/night1/calibrated")
        );
        assert_eq!(
            plan.dir_for(PipelineStage::Normalized),
            PathBuf::from("/out/M51/normalized")
        );
    }

    #[test]
    fn absolute_requires_output_root() {
        let r = roots(Path::new("/data/lights"), None);
        assert!(OutputPlan::new(PathMode::Absolute, Path::new(RAW), "M51", r, None).is_err());
        let r = roots(Path::new("/data/lights"), Some(Path::new("/out")));
        let plan = OutputPlan::new(PathMode::Absolute, Path::new(RAW), "M51", r, None).unwrap();
        assert_eq!(
            plan.output_path(PipelineStage::Calibrated, Path::new(RAW)),
            PathBuf::from("/out/calibrated/M51_001_c.fit")
        );
    }

    #[test]
    fn plan_rebuilt_from_stage_output_matches_raw_plan() {
        let r = roots(Path::new("/data/lights"), Some(Path::new("/out")));
        for mode in [PathMode::Relative, PathMode::RelativeWithObjectFolder] {
            let plan = OutputPlan::new(mode, Path::new(RAW), "M51", r, None).unwrap();
            let cal = plan.output_path(PipelineStage::Calibrated, Path::new(RAW));
            let rebuilt = OutputPlan::from_stage_output(
                mode,
                &cal,
                PipelineStage::Calibrated,
                "M51",
                r,
                None,
            )
            .unwrap();
            assert_eq!(rebuilt, plan);
        }
    }

    #[test]
    fn object_names_are_single_components() {
        assert_eq!(folder_name("NGC 7000/IC 5070"), "NGC 7000_IC 5070");
        assert_eq!(folder_name("  "), "unknown");
    }
}
