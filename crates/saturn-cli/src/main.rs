mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "saturn", about = "Astronomical frame preprocessing pipeline")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full processing pipeline over a directory tree
    Run(commands::run::RunArgs),
    /// Scan a directory tree and report stage counts and gaps
    Scan(commands::scan::ScanArgs),
    /// Show which master frames a light frame would be calibrated with
    Resolve(commands::resolve::ResolveArgs),
    /// Show FITS frame metadata and stage classification
    Info(commands::info::InfoArgs),
    /// Print or save a default run config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Scan(args) => commands::scan::run(args),
        Commands::Resolve(args) => commands::resolve::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
