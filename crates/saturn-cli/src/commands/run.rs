use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use saturn_core::engine::NativeEngine;
use saturn_core::metadata::FitsMetadataSource;
use saturn_core::output::PathMode;
use saturn_core::pipeline::{run_pipeline_reported, Pass, ProgressReporter, RunConfig};

use crate::summary::{print_run_config, print_run_summary};

#[derive(Clone, Copy, ValueEnum)]
pub enum PathModeArg {
    Auto,
    RootSubfolder,
    ObjectSubfolder,
    Absolute,
    Relative,
    RelativeObject,
    FinalsInObject,
}

impl From<PathModeArg> for PathMode {
    fn from(arg: PathModeArg) -> Self {
        match arg {
            PathModeArg::Auto => PathMode::Auto,
            PathModeArg::RootSubfolder => PathMode::PutInRootSubfolder,
            PathModeArg::ObjectSubfolder => PathMode::PutInObjectSubfolder,
            PathModeArg::Absolute => PathMode::Absolute,
            PathModeArg::Relative => PathMode::Relative,
            PathModeArg::RelativeObject => PathMode::RelativeWithObjectFolder,
            PathModeArg::FinalsInObject => PathMode::PutFinalsInObjectSubfolder,
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// Root directory to scan for frames (overrides the config file)
    pub input: Option<PathBuf>,

    /// Run config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output root for subfolder and absolute layouts
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Master frame library
    #[arg(long)]
    pub masters: Option<PathBuf>,

    /// Registration and normalization reference library
    #[arg(long)]
    pub references: Option<PathBuf>,

    /// Output directory layout
    #[arg(long, value_enum)]
    pub mode: Option<PathModeArg>,

    /// Name of the output subfolder for root-subfolder layouts
    #[arg(long)]
    pub subfolder: Option<String>,

    /// Regenerate outputs that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Recompute outputs instead of reusing them
    #[arg(long)]
    pub no_skip_existing: bool,

    /// Do not run the gap-filling pass
    #[arg(long)]
    pub no_backfill: bool,

    #[arg(long)]
    pub no_calibrate: bool,

    #[arg(long)]
    pub no_cosmetic: bool,

    #[arg(long)]
    pub no_debayer: bool,

    #[arg(long)]
    pub no_register: bool,

    #[arg(long)]
    pub no_normalize: bool,

    /// Sigma threshold for hot and cold pixel detection
    #[arg(long)]
    pub sigma: Option<f32>,

    /// Exit with an error when any frame failed or was left incomplete
    #[arg(long)]
    pub strict: bool,
}

/// Drives an `indicatif` bar from pipeline progress events.
struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    fn new() -> Result<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg:20} [{bar:40}] {pos}/{len}")?
                .progress_chars("=> "),
        );
        Ok(Self { bar })
    }
}

impl ProgressReporter for BarReporter {
    fn begin_pass(&self, pass: Pass, total_items: Option<usize>) {
        self.bar.reset();
        self.bar.set_length(total_items.unwrap_or(0) as u64);
        self.bar.set_message(pass.to_string());
    }

    fn advance(&self, items_done: usize) {
        self.bar.set_position(items_done as u64);
    }

    fn finish_pass(&self) {
        self.bar.finish_with_message("Done");
    }
}

pub fn run(args: &RunArgs) -> Result<()> {
    let mut config = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str(&contents).context("Invalid run config")?
    } else {
        let Some(ref input) = args.input else {
            bail!("An input directory or --config file is required");
        };
        RunConfig::new(input)
    };
    apply_args(&mut config, args);
    config.validate().context("Invalid run config")?;

    print_run_config(&config);

    let reporter = Arc::new(BarReporter::new()?);
    let (_, summary) = run_pipeline_reported(
        &config,
        &NativeEngine,
        &FitsMetadataSource,
        reporter.clone(),
    )?;
    reporter.bar.finish_and_clear();

    print_run_summary(&summary);

    if args.strict && !summary.is_clean() {
        bail!(
            "{} stage failures, {} incomplete frames",
            summary.total_failed(),
            summary.incomplete.len()
        );
    }
    Ok(())
}

/// Command-line flags take precedence over the config file.
fn apply_args(config: &mut RunConfig, args: &RunArgs) {
    if let Some(ref input) = args.input {
        config.input_root = input.clone();
    }
    if let Some(ref output) = args.output {
        config.output_root = Some(output.clone());
    }
    if let Some(ref masters) = args.masters {
        config.master_library = Some(masters.clone());
    }
    if let Some(ref references) = args.references {
        config.reference_library = Some(references.clone());
    }
    if let Some(mode) = args.mode {
        config.path_mode = mode.into();
    }
    if let Some(ref subfolder) = args.subfolder {
        config.root_subfolder = subfolder.clone();
    }
    if let Some(sigma) = args.sigma {
        config.cosmetic.sigma = sigma;
    }
    config.overwrite |= args.overwrite;
    config.skip_existing &= !args.no_skip_existing;
    config.backfill &= !args.no_backfill;

    let stages = &mut config.stages;
    stages.calibrate &= !args.no_calibrate;
    stages.cosmetic &= !args.no_cosmetic;
    stages.debayer &= !args.no_debayer;
    stages.register &= !args.no_register;
    stages.normalize &= !args.no_normalize;
}
