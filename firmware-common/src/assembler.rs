//! Image assembly.
//!
//! Writes one complete image in a single pass:
//!
//! ```text
//! Header -> Description -> Tile -> Partition(0..n) -> Checksum
//! ```
//!
//! The first error ends the run. Bytes already written stay in the sink; for
//! [`assemble_to_file`] that means a truncated file is left on disk.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::checksum::ChecksumWriter;
use crate::error::{FirmwareError, PartitionField, Result};
use crate::format::{DESCRIPTION_SIZE, GO_FIRMWARE_FORMAT, HEADER_SIZE, fixed_field};
use crate::partition::{LABEL_SIZE, PartitionRecord, PartitionSpec, resolve};
use crate::pixel::TileRaster;
use crate::tile::load_tile;

/// Partition payloads are streamed through a buffer of this size.
pub const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Where the tile raster comes from.
#[derive(Debug, Clone)]
pub enum TileSource {
    /// PNG image or raw RGB565 file, loaded when the tile is written
    File(PathBuf),
    /// Already converted raster
    Raster(TileRaster),
}

/// Everything needed to build one image.
#[derive(Debug, Clone)]
pub struct FirmwareSpec {
    pub header: String,
    pub description: String,
    pub tile: TileSource,
    pub partitions: Vec<PartitionSpec>,
}

impl FirmwareSpec {
    /// Spec with the default header and no partitions.
    pub fn new(description: impl Into<String>, tile: TileSource) -> Self {
        Self {
            header: GO_FIRMWARE_FORMAT.default_header.to_string(),
            description: description.into(),
            tile,
            partitions: Vec::new(),
        }
    }
}

/// Assembly step, used to label write failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Header,
    Description,
    Tile,
    Partition(usize),
    Checksum,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Header => f.write_str("header"),
            Stage::Description => f.write_str("description"),
            Stage::Tile => f.write_str("tile"),
            Stage::Partition(index) => write!(f, "partition {}", index),
            Stage::Checksum => f.write_str("checksum"),
        }
    }
}

/// What was written for one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSummary {
    pub label: String,
    /// Capacity stored in the record
    pub length: u32,
    /// Real size of the backing file
    pub actual_size: u32,
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblySummary {
    pub checksum: u32,
    /// Total image size including the checksum
    pub total_bytes: u64,
    pub partitions: Vec<PartitionSummary>,
}

/// Streams one image into a sink.
struct Assembler<W: Write> {
    out: ChecksumWriter<W>,
    /// Reused for every partition copy
    buffer: Vec<u8>,
}

impl<W: Write> Assembler<W> {
    fn new(sink: W) -> Self {
        Self {
            out: ChecksumWriter::new(sink),
            buffer: vec![0u8; COPY_CHUNK_SIZE],
        }
    }

    fn write(&mut self, stage: Stage, bytes: &[u8]) -> Result<()> {
        self.out
            .write_all(bytes)
            .map_err(|e| FirmwareError::write(stage.to_string(), e))
    }

    fn write_header(&mut self, header: &str) -> Result<()> {
        if header.len() < HEADER_SIZE {
            tracing::warn!(
                "Header {:?} is shorter than {} bytes, padding with zeros",
                header,
                HEADER_SIZE
            );
        } else if header.len() > HEADER_SIZE {
            tracing::warn!("Header {:?} truncated to {} bytes", header, HEADER_SIZE);
        }
        let field: [u8; HEADER_SIZE] = fixed_field(header.as_bytes());
        self.write(Stage::Header, &field)?;
        tracing::info!("Header: {}", String::from_utf8_lossy(&field).trim_end_matches('\0'));
        Ok(())
    }

    fn write_description(&mut self, description: &str) -> Result<()> {
        if description.len() > DESCRIPTION_SIZE {
            tracing::warn!(
                "Description {:?} truncated to {} bytes",
                description,
                DESCRIPTION_SIZE
            );
        }
        let field: [u8; DESCRIPTION_SIZE] = fixed_field(description.as_bytes());
        self.write(Stage::Description, &field)?;
        tracing::info!("Description: {}", description);
        Ok(())
    }

    fn write_tile(&mut self, tile: &TileSource) -> Result<()> {
        let bytes = match tile {
            TileSource::File(path) => {
                let raster = load_tile(path)?;
                tracing::info!("Tile: {}", path.display());
                raster.to_le_bytes()
            }
            TileSource::Raster(raster) => {
                tracing::info!("Tile: in-memory raster");
                raster.to_le_bytes()
            }
        };
        self.write(Stage::Tile, &bytes)
    }

    fn write_partition(&mut self, index: usize, spec: &PartitionSpec) -> Result<PartitionSummary> {
        spec.validate(index)?;

        let what = format!("partition {} file", index);
        let file = File::open(&spec.file).map_err(|e| FirmwareError::read(&what, &spec.file, e))?;
        let actual = file
            .metadata()
            .map_err(|e| FirmwareError::read(&what, &spec.file, e))?
            .len();

        // nothing for this partition is written until its size checks pass
        let length = resolve(index, spec.length, actual)?;
        let actual_size = u32::try_from(actual).map_err(|_| FirmwareError::TooLarge {
            index,
            field: PartitionField::Length,
            text: actual.to_string(),
        })?;

        if spec.label.len() > LABEL_SIZE {
            tracing::warn!(
                "Partition {} label {:?} truncated to {} bytes",
                index,
                spec.label,
                LABEL_SIZE
            );
        }

        let record = PartitionRecord::new(spec, length);
        let stage = Stage::Partition(index);
        self.write(stage, &record.to_bytes())?;
        self.write(stage, &actual_size.to_le_bytes())?;
        self.copy_file(index, &spec.file, file, actual)?;

        tracing::info!(
            "[{}] type={}, subtype={:#04x}, length={}, actual={}, label={}",
            index,
            spec.partition_type,
            spec.subtype,
            length,
            actual_size,
            record.label_text()
        );

        Ok(PartitionSummary {
            label: record.label_text(),
            length,
            actual_size,
        })
    }

    /// Stream exactly `size` bytes of `file` into the image.
    fn copy_file(&mut self, index: usize, path: &Path, file: File, size: u64) -> Result<()> {
        let what = format!("partition {} file", index);
        let mut reader = file.take(size);
        let mut copied: u64 = 0;

        loop {
            let n = match reader.read(&mut self.buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(FirmwareError::read(&what, path, e)),
            };
            self.out
                .write_all(&self.buffer[..n])
                .map_err(|e| FirmwareError::write(Stage::Partition(index).to_string(), e))?;
            copied += n as u64;
            tracing::debug!("[{}] copied {}/{} bytes", index, copied, size);
        }

        if copied != size {
            return Err(FirmwareError::read(
                &what,
                path,
                std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("file shrank to {} bytes while copying, expected {}", copied, size),
                ),
            ));
        }
        Ok(())
    }

    fn finish(self) -> Result<(W, u32, u64)> {
        let total = self.out.bytes_written() + crate::format::CHECKSUM_SIZE as u64;
        let (sink, checksum) = self
            .out
            .finish()
            .map_err(|e| FirmwareError::write(Stage::Checksum.to_string(), e))?;
        tracing::info!("Checksum: {:#010x}", checksum);
        Ok((sink, checksum, total))
    }
}

/// Assemble a complete image into `sink`.
pub fn assemble<W: Write>(spec: &FirmwareSpec, sink: W) -> Result<AssemblySummary> {
    assemble_into(spec, sink).map(|(_, summary)| summary)
}

/// Assemble into `sink` and hand the sink back.
pub fn assemble_into<W: Write>(spec: &FirmwareSpec, sink: W) -> Result<(W, AssemblySummary)> {
    let mut assembler = Assembler::new(sink);

    assembler.write_header(&spec.header)?;
    assembler.write_description(&spec.description)?;
    assembler.write_tile(&spec.tile)?;

    let mut partitions = Vec::with_capacity(spec.partitions.len());
    for (index, partition) in spec.partitions.iter().enumerate() {
        partitions.push(assembler.write_partition(index, partition)?);
    }

    let (sink, checksum, total_bytes) = assembler.finish()?;
    Ok((
        sink,
        AssemblySummary {
            checksum,
            total_bytes,
            partitions,
        },
    ))
}

/// Create (or truncate) `path` and assemble the image into it.
///
/// On failure the partially written file is left in place.
pub fn assemble_to_file(spec: &FirmwareSpec, path: &Path) -> Result<AssemblySummary> {
    let file = File::create(path)
        .map_err(|e| FirmwareError::write(format!("output file {}", path.display()), e))?;
    tracing::info!("Writing {}", path.display());

    let (writer, summary) = assemble_into(spec, BufWriter::new(file))?;
    writer
        .into_inner()
        .map_err(|e| FirmwareError::write("output file", e.into_error()))?
        .sync_all()
        .map_err(|e| FirmwareError::write("output file", e))?;
    Ok(summary)
}
