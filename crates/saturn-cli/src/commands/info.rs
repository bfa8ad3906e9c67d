use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use saturn_core::io::fits::FitsReader;
use saturn_core::metadata::FrameMetadata;
use saturn_core::stage::classify;

#[derive(Args)]
pub struct InfoArgs {
    /// Input FITS file
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let reader = FitsReader::open(&args.file)?;
    let (width, height) = reader.dimensions()?;
    let (signature, stage) = classify(&args.file);

    println!("File:        {}", args.file.display());
    println!("Dimensions:  {}x{}", width, height);
    println!("Signature:   {}", signature);
    println!("Stage:       {}", stage);

    match FrameMetadata::from_header(&reader.header, &args.file) {
        Ok(meta) => {
            println!("Object:      {}", meta.object);
            println!("Instrument:  {}", meta.instrument);
            println!("Observer:    {}", meta.observer);
            println!("Date:        {} {}", meta.date, meta.time);
            println!("Filter:      {}", meta.filter);
            println!("Exposure:    {}s", meta.exposure);
            println!("Temperature: {}C", meta.temperature);
            println!("Binning:     {}", meta.binning);
            if let Some(pattern) = meta.cfa {
                println!("Bayer:       {}", pattern);
            }
        }
        Err(e) => println!("Metadata:    incomplete ({e})"),
    }

    let history = reader
        .header
        .cards()
        .iter()
        .filter(|c| c.keyword == "HISTORY")
        .count();
    if history > 0 {
        println!("History:     {} entries", history);
    }

    Ok(())
}
