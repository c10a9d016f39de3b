//! Tile source loading.
//!
//! A `.png` tile goes through the PNG decoder and the pixel converter. Any
//! other file is taken as a ready-made little-endian RGB565 raster and must
//! be exactly [`TILE_BYTES`] long.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{DecodeError, FirmwareError, Result};
use crate::pixel::{self, TILE_BYTES, TileRaster};

/// Whether `path` names a PNG image (case-insensitive `.png` suffix).
pub fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

/// Load the tile raster from `path`.
pub fn load_tile(path: &Path) -> Result<TileRaster> {
    if is_png(path) {
        // a colour layout the converter has no rule for is bad input, not a read failure
        let image = pixel::load_png(path).map_err(|e| match e {
            FirmwareError::Decode {
                source: DecodeError::UnsupportedFormat(format),
                ..
            } => FirmwareError::UnsupportedPixelFormat(format),
            other => other,
        })?;
        return pixel::convert(&image);
    }
    load_raw(path)
}

fn load_raw(path: &Path) -> Result<TileRaster> {
    let file = File::open(path).map_err(|e| FirmwareError::read("tile file", path, e))?;

    // one byte past the raster is enough to tell "too large" apart
    let mut bytes = Vec::with_capacity(TILE_BYTES + 1);
    file.take(TILE_BYTES as u64 + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| FirmwareError::read("tile file", path, e))?;

    if bytes.len() < TILE_BYTES {
        return Err(FirmwareError::TileTooSmall {
            path: path.to_path_buf(),
            expected: TILE_BYTES,
            actual: bytes.len() as u64,
        });
    }
    if bytes.len() > TILE_BYTES {
        let actual = std::fs::metadata(path)
            .map(|m| m.len())
            .unwrap_or(bytes.len() as u64);
        return Err(FirmwareError::TileTooLarge {
            path: path.to_path_buf(),
            expected: TILE_BYTES,
            actual,
        });
    }

    TileRaster::from_le_bytes(&bytes).ok_or_else(|| FirmwareError::TileTooSmall {
        path: path.to_path_buf(),
        expected: TILE_BYTES,
        actual: bytes.len() as u64,
    })
}
