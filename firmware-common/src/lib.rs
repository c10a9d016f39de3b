//! ODROID-GO firmware image assembly
//!
//! This crate builds `.fw` images and reads them back. It is used by:
//! - `mkfw` (image assembler)
//! - `fwinfo` (image inspector)
//!
//! # Modules
//!
//! - [`format`] - Image layout constants and fixed-width field helpers
//! - [`checksum`] - CRC-32 accumulating output sink
//! - [`partition`] - Partition parsing, size resolution and record encoding
//! - [`pixel`] - PNG decoding and conversion to the RGB565 tile raster
//! - [`tile`] - Tile loading from PNG or raw files
//! - [`assembler`] - Single-pass image writer
//! - [`inspect`] - Read-only image parser

pub mod assembler;
pub mod checksum;
pub mod error;
pub mod format;
pub mod inspect;
pub mod partition;
pub mod pixel;
pub mod tile;

// Re-export the error type
pub use error::{DecodeError, ErrorKind, FirmwareError, Result};

// Re-export format constants
pub use format::{DEFAULT_FIRMWARE_NAME, FirmwareFormat, GO_FIRMWARE_FORMAT};

// Re-export assembly entry points
pub use assembler::{
    AssemblySummary, FirmwareSpec, PartitionSummary, TileSource, assemble, assemble_into,
    assemble_to_file,
};
pub use checksum::ChecksumWriter;
pub use inspect::{FirmwareImage, PartitionEntry};

// Re-export partition and pixel types
pub use partition::{PartitionLength, PartitionRecord, PartitionSpec, PartitionType};
pub use pixel::{DecodedImage, PixelFormat, TileRaster};
pub use tile::load_tile;
