use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use saturn_core::metadata::{FitsMetadataSource, MetadataSource};
use saturn_core::pipeline::RunConfig;
use saturn_core::resolve::MasterResolver;

#[derive(Args)]
pub struct ResolveArgs {
    /// Light frame to resolve masters for
    pub file: PathBuf,

    /// Master frame library
    #[arg(long)]
    pub masters: PathBuf,

    /// Run config file (TOML) supplying layout and tolerances
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: &ResolveArgs) -> Result<()> {
    let config: RunConfig = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str(&contents).context("Invalid run config")?
    } else {
        RunConfig::default()
    };

    let meta = FitsMetadataSource
        .read_metadata(&args.file)
        .with_context(|| format!("Failed to read metadata of {}", args.file.display()))?;

    let resolver = MasterResolver {
        library: &args.masters,
        layout: &config.masters,
        tolerances: &config.tolerances,
        aliases: &config.filter_aliases,
        extensions: &config.scan.extensions,
    };

    println!("Frame:       {}", args.file.display());
    println!(
        "Match:       {} / {}C / bin {} / {} / {}s",
        meta.instrument, meta.temperature, meta.binning, meta.filter, meta.exposure
    );
    let masters = resolver.resolve(&meta)?;
    println!("Bias:        {}", masters.bias.display());
    println!(
        "Dark:        {} ({}s)",
        masters.dark.display(),
        masters.dark_exposure
    );
    println!("Flat:        {}", masters.flat.display());

    Ok(())
}
