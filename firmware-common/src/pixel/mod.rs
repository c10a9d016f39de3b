//! Tile pixel formats and the fixed-size RGB565 tile raster.

pub mod convert;
pub mod decode;

use crate::format::GO_FIRMWARE_FORMAT;

pub use convert::convert;
pub use decode::{decode_png, load_png};

/// Pixels in the tile raster.
pub const TILE_PIXELS: usize = GO_FIRMWARE_FORMAT.tile_pixels();

/// Bytes in the encoded tile raster.
pub const TILE_BYTES: usize = GO_FIRMWARE_FORMAT.tile_bytes();

/// Sample layout of a decoded source image.
///
/// Sub-byte formats pack pixels most-significant bits first with no padding
/// between rows. 16-bit samples are big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
    Rgb16,
    Rgba16,
    Luminance1,
    Luminance2,
    Luminance4,
    Luminance8,
    LuminanceAlpha1,
    LuminanceAlpha2,
    LuminanceAlpha4,
    LuminanceAlpha8,
}

impl PixelFormat {
    /// Bits occupied by one source pixel.
    pub fn bits_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 24,
            PixelFormat::Rgba8 => 32,
            PixelFormat::Rgb16 => 48,
            PixelFormat::Rgba16 => 64,
            PixelFormat::Luminance1 => 1,
            PixelFormat::Luminance2 => 2,
            PixelFormat::Luminance4 => 4,
            PixelFormat::Luminance8 => 8,
            PixelFormat::LuminanceAlpha1 => 2,
            PixelFormat::LuminanceAlpha2 => 4,
            PixelFormat::LuminanceAlpha4 => 8,
            PixelFormat::LuminanceAlpha8 => 16,
        }
    }

    /// Source bytes needed for `pixels` pixels.
    pub fn buffer_size(self, pixels: usize) -> usize {
        (pixels * self.bits_per_pixel()).div_ceil(8)
    }

    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::Rgb8 => "RGB8",
            PixelFormat::Rgba8 => "RGBA8",
            PixelFormat::Rgb16 => "RGB16",
            PixelFormat::Rgba16 => "RGBA16",
            PixelFormat::Luminance1 => "LUMINANCE1",
            PixelFormat::Luminance2 => "LUMINANCE2",
            PixelFormat::Luminance4 => "LUMINANCE4",
            PixelFormat::Luminance8 => "LUMINANCE8",
            PixelFormat::LuminanceAlpha1 => "LUMINANCE_ALPHA1",
            PixelFormat::LuminanceAlpha2 => "LUMINANCE_ALPHA2",
            PixelFormat::LuminanceAlpha4 => "LUMINANCE_ALPHA4",
            PixelFormat::LuminanceAlpha8 => "LUMINANCE_ALPHA8",
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded, non-interlaced source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
}

/// The 86x48 RGB565 thumbnail embedded in every image.
#[derive(Clone, PartialEq, Eq)]
pub struct TileRaster {
    pixels: Box<[u16; TILE_PIXELS]>,
}

impl TileRaster {
    /// All-black raster.
    pub fn new() -> Self {
        Self {
            pixels: Box::new([0u16; TILE_PIXELS]),
        }
    }

    /// Read a pre-formatted raster of exactly [`TILE_BYTES`] little-endian bytes.
    pub fn from_le_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != TILE_BYTES {
            return None;
        }
        let mut raster = Self::new();
        for (px, chunk) in raster.pixels.iter_mut().zip(bytes.chunks_exact(2)) {
            *px = u16::from_le_bytes([chunk[0], chunk[1]]);
        }
        Some(raster)
    }

    /// Encode as little-endian RGB565.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|px| px.to_le_bytes()).collect()
    }

    pub fn pixels(&self) -> &[u16; TILE_PIXELS] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u16; TILE_PIXELS] {
        &mut self.pixels
    }
}

impl Default for TileRaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TileRaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileRaster")
            .field("pixels", &TILE_PIXELS)
            .finish()
    }
}
