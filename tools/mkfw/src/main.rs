//! mkfw - Build ODROID-GO firmware images
//!
//! # Usage
//!
//! ```bash
//! # Description, tile, then one 5-tuple per partition
//! mkfw "My Game" tile.png app factory auto game game.bin
//!
//! # Custom header and output file
//! mkfw -H ODROIDGO_FIRMWARE_V00_01 -o game.fw "My Game" tile.raw \
//!     app ota_0 1M main main.bin \
//!     data nvs 64K nvs nvs.bin
//!
//! # Everything from a manifest
//! mkfw -m mkfw.toml
//! ```
//!
//! Exit codes: 0 success, -1 invalid parameters, -2 read error, -3 write error.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use firmware_common::{
    DEFAULT_FIRMWARE_NAME, ErrorKind, FirmwareError, FirmwareSpec, GO_FIRMWARE_FORMAT,
    PartitionSpec, TileSource, assemble_to_file,
};
use mkfw::manifest::{FirmwareManifest, resolve_path};

/// Names of the five values that make up one partition argument group.
const PARTITION_FIELDS: [&str; 5] = ["type", "subtype", "length", "label", "binary file"];

/// Build an ODROID-GO firmware image
#[derive(Parser, Debug)]
#[command(name = "mkfw")]
#[command(about = "Build an ODROID-GO firmware image (.fw)")]
#[command(version)]
struct Cli {
    /// Firmware description (up to 40 bytes)
    description: Option<String>,

    /// Tile image: 86x48 PNG, or a raw 8256-byte RGB565 file
    tile: Option<PathBuf>,

    /// Partitions, five values each: type subtype length label binary
    ///
    /// type: app, data, or 0x40-0xFE. subtype: factory, ota_0..ota_15 (app),
    /// ota, phy, nvs (data), or a number. length: auto, or a multiple of 64K
    /// with an optional K/M suffix.
    #[arg(value_name = "PARTITION")]
    partitions: Vec<String>,

    /// Image header (24 bytes)
    #[arg(short = 'H', long)]
    header: Option<String>,

    /// Output file
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Only print warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Read the image description from a mkfw.toml manifest
    #[arg(short, long)]
    manifest: Option<PathBuf>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not failures
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

    if let Err(e) = run(cli) {
        tracing::error!("{:#}", e);
        std::process::exit(mkfw::exit_code(&e));
    }
}

fn run(cli: Cli) -> Result<()> {
    let (spec, out) = build_spec(cli)?;
    if !mkfw::has_firmware_extension(&out) {
        tracing::warn!(
            "Output {} does not use the .{} extension",
            out.display(),
            GO_FIRMWARE_FORMAT.extension
        );
    }
    let summary = assemble_to_file(&spec, &out)?;

    tracing::info!(
        "Wrote {} ({} bytes, {} partitions, crc32 {:#010x})",
        out.display(),
        summary.total_bytes,
        summary.partitions.len(),
        summary.checksum
    );
    Ok(())
}

/// Merge command-line arguments over the optional manifest.
fn build_spec(cli: Cli) -> Result<(FirmwareSpec, PathBuf)> {
    let (manifest, base_dir) = match &cli.manifest {
        Some(path) => {
            let manifest = FirmwareManifest::load(path)?;
            let base_dir = path.parent().unwrap_or(Path::new("")).to_path_buf();
            (Some(manifest), base_dir)
        }
        None => (None, PathBuf::new()),
    };
    let section = manifest.as_ref().map(|m| &m.firmware);

    let description = cli
        .description
        .or_else(|| section.and_then(|s| s.description.clone()))
        .context("Missing firmware description")?;

    let tile = cli
        .tile
        .or_else(|| section.and_then(|s| s.tile.as_deref()).map(|t| resolve_path(&base_dir, t)))
        .context("Missing tile file")?;

    let partitions = if !cli.partitions.is_empty() || manifest.is_none() {
        parse_partitions(&cli.partitions)?
    } else {
        manifest
            .as_ref()
            .map(|m| m.partition_specs(&base_dir))
            .transpose()?
            .unwrap_or_default()
    };

    let header = cli
        .header
        .or_else(|| section.and_then(|s| s.header.clone()))
        .unwrap_or_else(|| GO_FIRMWARE_FORMAT.default_header.to_string());

    let out = cli
        .out
        .or_else(|| section.and_then(|s| s.output.as_deref()).map(|o| resolve_path(&base_dir, o)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FIRMWARE_NAME));

    let mut spec = FirmwareSpec::new(description, TileSource::File(tile));
    spec.header = header;
    spec.partitions = partitions;
    Ok((spec, out))
}

/// Split trailing positional values into partition 5-tuples.
fn parse_partitions(values: &[String]) -> firmware_common::Result<Vec<PartitionSpec>> {
    values
        .chunks(PARTITION_FIELDS.len())
        .enumerate()
        .map(|(index, group)| match group {
            [kind, subtype, length, label, file] => {
                PartitionSpec::parse(index, kind, subtype, length, label, file)
            }
            _ => Err(FirmwareError::MissingArgument {
                index,
                what: PARTITION_FIELDS[group.len()],
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use firmware_common::PartitionLength;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mkfw").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_positional_partitions() {
        let cli = cli(&[
            "demo", "tile.raw", "app", "ota_0", "auto", "main", "a.bin", "data", "nvs", "64K",
            "nvs", "nvs.bin",
        ]);
        let (spec, out) = build_spec(cli).unwrap();

        assert_eq!(spec.description, "demo");
        assert_eq!(spec.header, "ODROIDGO_FIRMWARE_V00_01");
        assert_eq!(out, PathBuf::from("firmware.fw"));
        assert_eq!(spec.partitions.len(), 2);
        assert_eq!(spec.partitions[1].subtype, 2);
        assert_eq!(spec.partitions[1].length, PartitionLength::Fixed(65536));
    }

    #[test]
    fn test_options() {
        let cli = cli(&["-H", "CUSTOM", "-o", "x.fw", "-q", "demo", "tile.raw"]);
        assert!(cli.quiet);
        let (spec, out) = build_spec(cli).unwrap();
        assert_eq!(spec.header, "CUSTOM");
        assert_eq!(out, PathBuf::from("x.fw"));
        assert!(spec.partitions.is_empty());
    }

    #[test]
    fn test_incomplete_partition_tuple() {
        let values: Vec<String> = ["app", "factory", "auto", "main", "a.bin", "data", "nvs"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let err = parse_partitions(&values).unwrap_err();
        assert!(matches!(
            err,
            FirmwareError::MissingArgument {
                index: 1,
                what: "length"
            }
        ));
        assert_eq!(err.exit_code(), -1);
    }

    #[test]
    fn test_missing_tile() {
        let err = build_spec(cli(&["demo"])).unwrap_err();
        assert_eq!(mkfw::exit_code(&err), -1);
    }
}
