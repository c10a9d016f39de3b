//! Firmware image format constants for the ODROID-GO.
//!
//! [`GO_FIRMWARE_FORMAT`] is the single source of truth for the fixed field
//! widths, the tile geometry and the partition alignment used by both the
//! assembler and the inspector.
//!
//! # Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  header          24 bytes   ASCII, zero-padded/truncated │
//! │  description     40 bytes   ASCII, zero-padded/truncated │
//! │  tile          8256 bytes   86x48 RGB565, little-endian  │
//! ├──────────────────────────────────────────────────────────┤
//! │  per partition:                                          │
//! │    record        28 bytes   see PartitionRecord          │
//! │    actual size    4 bytes   u32 LE                       │
//! │    payload        n bytes   raw backing-file contents    │
//! ├──────────────────────────────────────────────────────────┤
//! │  crc32            4 bytes   u32 LE over all of the above │
//! └──────────────────────────────────────────────────────────┘
//! ```

/// Fixed layout parameters of a firmware image.
#[derive(Debug, Clone, Copy)]
pub struct FirmwareFormat {
    /// Conventional file extension without dot
    pub extension: &'static str,

    /// Header written when the caller does not supply one
    pub default_header: &'static str,

    /// Width of the header field in bytes
    pub header_size: usize,

    /// Width of the description field in bytes
    pub description_size: usize,

    /// Tile width in pixels
    pub tile_width: u32,

    /// Tile height in pixels
    pub tile_height: u32,

    /// Every declared partition length is a multiple of this
    pub partition_alignment: u32,
}

impl FirmwareFormat {
    /// Number of pixels in the tile raster.
    pub const fn tile_pixels(&self) -> usize {
        self.tile_width as usize * self.tile_height as usize
    }

    /// Size of the tile raster in bytes (two bytes per RGB565 pixel).
    pub const fn tile_bytes(&self) -> usize {
        self.tile_pixels() * 2
    }

    /// Offset of the first partition record.
    pub const fn partitions_offset(&self) -> usize {
        self.header_size + self.description_size + self.tile_bytes()
    }
}

/// Width of the header field.
pub const HEADER_SIZE: usize = 24;

/// Width of the description field.
pub const DESCRIPTION_SIZE: usize = 40;

/// ODROID-GO firmware format.
pub const GO_FIRMWARE_FORMAT: FirmwareFormat = FirmwareFormat {
    extension: "fw",
    default_header: "ODROIDGO_FIRMWARE_V00_01",
    header_size: HEADER_SIZE,
    description_size: DESCRIPTION_SIZE,
    tile_width: 86,
    tile_height: 48,
    partition_alignment: 64 * 1024,
};

/// Output file name used when none is given.
pub const DEFAULT_FIRMWARE_NAME: &str = "firmware.fw";

/// Size of the trailing checksum field.
pub const CHECKSUM_SIZE: usize = 4;

/// Size of the actual-file-size field that follows every partition record.
pub const FILE_SIZE_FIELD: usize = 4;

/// Copy `text` into a fixed-width field, truncating or zero-padding it.
///
/// The result is not null-terminated when `text` fills the whole field.
pub fn fixed_field<const N: usize>(text: &[u8]) -> [u8; N] {
    let mut field = [0u8; N];
    let len = text.len().min(N);
    field[..len].copy_from_slice(&text[..len]);
    field
}

/// Read a fixed-width field back as text, stopping at the first zero byte.
pub fn field_text(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
