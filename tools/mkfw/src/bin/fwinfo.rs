//! fwinfo - Print the layout of an ODROID-GO firmware image
//!
//! Exits 0 only when the image parses and its checksum matches.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use firmware_common::{ErrorKind, FirmwareImage, PartitionType};

/// Inspect an ODROID-GO firmware image
#[derive(Parser, Debug)]
#[command(name = "fwinfo")]
#[command(about = "Print the layout of an ODROID-GO firmware image and verify its checksum")]
#[command(version)]
struct Cli {
    /// Firmware image (.fw)
    file: PathBuf,

    /// Only print warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                ErrorKind::InvalidParams.exit_code()
            } else {
                0
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    mkfw::init_logging(cli.quiet);

    if let Err(e) = run(&cli) {
        tracing::error!("{:#}", e);
        std::process::exit(mkfw::exit_code(&e));
    }
}

fn run(cli: &Cli) -> Result<()> {
    let data = std::fs::read(&cli.file)
        .with_context(|| format!("Failed to read firmware image: {}", cli.file.display()))?;
    let image = FirmwareImage::parse(&data)?;

    println!("File:        {}", cli.file.display());
    println!("Size:        {} bytes", data.len());
    println!("Header:      {}", image.header);
    println!("Description: {}", image.description);
    println!("Checksum:    {:#010x} (ok)", image.checksum);
    println!("Partitions:  {}", image.partitions.len());

    for (index, entry) in image.partitions.iter().enumerate() {
        let record = &entry.record;
        let kind = PartitionType::from_code(record.partition_type)
            .map(|t| t.to_string())
            .unwrap_or_else(|| format!("{:#04x} (reserved)", record.partition_type));
        println!(
            "  [{}] {:<16} type={} subtype={:#04x} length={} actual={} offset={}",
            index,
            record.label_text(),
            kind,
            record.subtype,
            record.length,
            entry.actual_size,
            entry.payload.start
        );
    }

    Ok(())
}
