use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use saturn_core::pipeline::RunConfig;
use saturn_core::registry::Registry;
use saturn_core::scan::scan_frames;

use crate::summary::print_scan_report;

#[derive(Args)]
pub struct ScanArgs {
    /// Root directory to scan
    pub input: PathBuf,

    /// Run config file (TOML) supplying scan filters and enabled stages
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// List every frame with a stage gap
    #[arg(long)]
    pub gaps: bool,
}

pub fn run(args: &ScanArgs) -> Result<()> {
    let config: RunConfig = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str(&contents).context("Invalid run config")?
    } else {
        RunConfig::default()
    };

    let files = scan_frames(&args.input, &config.scan)
        .with_context(|| format!("Failed to scan {}", args.input.display()))?;
    let mut registry = Registry::new();
    for path in &files {
        registry.upsert_path(path);
    }

    let gaps = registry.gaps(&config.stages.producing());
    print_scan_report(&args.input, files.len(), &registry, &gaps, args.gaps);
    Ok(())
}
