//! PNG tile decoding.
//!
//! Decodes without any colour transformations so the converter sees the
//! samples exactly as stored. Sub-byte rows are repacked into one continuous
//! bitstream because the converter does not model row padding.
//!
//! Only tile-sized images are decoded. The header dimensions are checked
//! before the frame buffer is allocated.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use png::{BitDepth, ColorType, DecodingError, Transformations};

use crate::error::{DecodeError, FirmwareError, Result};
use crate::format::GO_FIRMWARE_FORMAT;

use super::{DecodedImage, PixelFormat};

/// Decode a PNG file into a [`DecodedImage`].
pub fn load_png(path: &Path) -> Result<DecodedImage> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => FirmwareError::Decode {
            path: path.to_path_buf(),
            source: DecodeError::NotFound,
        },
        _ => FirmwareError::read("tile file", path, e),
    })?;

    let image = decode_png(BufReader::new(file)).map_err(|source| match source {
        DecodeError::Dimensions { width, height } => FirmwareError::TileDimensions {
            width,
            height,
            expected_width: GO_FIRMWARE_FORMAT.tile_width,
            expected_height: GO_FIRMWARE_FORMAT.tile_height,
        },
        source => FirmwareError::Decode {
            path: path.to_path_buf(),
            source,
        },
    })?;

    tracing::debug!(
        "Decoded {:?}: {}x{} {}",
        path,
        image.width,
        image.height,
        image.format
    );
    Ok(image)
}

/// Decode PNG data from any reader.
///
/// Fails with [`DecodeError::Dimensions`] unless the image is exactly one tile.
pub fn decode_png<R: Read>(reader: R) -> std::result::Result<DecodedImage, DecodeError> {
    let mut decoder = png::Decoder::new(reader);
    decoder.set_transformations(Transformations::IDENTITY);

    let mut reader = decoder.read_info().map_err(header_error)?;
    if reader.info().interlaced {
        return Err(DecodeError::InterlacedUnsupported);
    }

    let (color_type, bit_depth) = reader.output_color_type();
    let format = pixel_format(color_type, bit_depth)?;

    let (width, height) = (reader.info().width, reader.info().height);
    if (width, height) != (GO_FIRMWARE_FORMAT.tile_width, GO_FIRMWARE_FORMAT.tile_height) {
        return Err(DecodeError::Dimensions { width, height });
    }

    let mut buf = vec![0u8; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf).map_err(data_error)?;

    let pixels = pack_rows(
        &buf[..frame.buffer_size()],
        frame.line_size,
        frame.width as usize,
        frame.height as usize,
        format.bits_per_pixel(),
    );

    Ok(DecodedImage {
        width: frame.width,
        height: frame.height,
        format,
        pixels,
    })
}

fn pixel_format(
    color_type: ColorType,
    bit_depth: BitDepth,
) -> std::result::Result<PixelFormat, DecodeError> {
    let format = match (color_type, bit_depth) {
        (ColorType::Rgb, BitDepth::Eight) => PixelFormat::Rgb8,
        (ColorType::Rgba, BitDepth::Eight) => PixelFormat::Rgba8,
        (ColorType::Rgb, BitDepth::Sixteen) => PixelFormat::Rgb16,
        (ColorType::Rgba, BitDepth::Sixteen) => PixelFormat::Rgba16,
        (ColorType::Grayscale, BitDepth::One) => PixelFormat::Luminance1,
        (ColorType::Grayscale, BitDepth::Two) => PixelFormat::Luminance2,
        (ColorType::Grayscale, BitDepth::Four) => PixelFormat::Luminance4,
        (ColorType::Grayscale, BitDepth::Eight) => PixelFormat::Luminance8,
        (ColorType::GrayscaleAlpha, BitDepth::Eight) => PixelFormat::LuminanceAlpha8,
        (color_type, bit_depth) => {
            return Err(DecodeError::UnsupportedFormat(format!(
                "{:?} at {} bits",
                color_type, bit_depth as u8
            )));
        }
    };
    Ok(format)
}

/// Drop the per-row padding bits that PNG adds to sub-byte scanlines.
fn pack_rows(
    buf: &[u8],
    line_size: usize,
    width: usize,
    height: usize,
    bits_per_pixel: usize,
) -> Vec<u8> {
    let row_bits = width * bits_per_pixel;
    let rows = buf.chunks(line_size).take(height);

    if row_bits % 8 == 0 {
        let row_bytes = row_bits / 8;
        return rows.flat_map(|row| &row[..row_bytes]).copied().collect();
    }

    let mut out = vec![0u8; (row_bits * height).div_ceil(8)];
    let mut pos = 0;
    for row in rows {
        for bit in 0..row_bits {
            if row[bit / 8] & (0x80 >> (bit % 8)) != 0 {
                out[pos / 8] |= 0x80 >> (pos % 8);
            }
            pos += 1;
        }
    }
    out
}

fn header_error(err: DecodingError) -> DecodeError {
    match err {
        DecodingError::Format(e) => DecodeError::BadHeader(e.to_string()),
        other => data_error(other),
    }
}

fn data_error(err: DecodingError) -> DecodeError {
    match err {
        DecodingError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
            DecodeError::NotFound
        }
        DecodingError::IoError(e) => DecodeError::Malformed(e.to_string()),
        DecodingError::Format(e) => DecodeError::Malformed(e.to_string()),
        DecodingError::Parameter(e) => DecodeError::BadParameter(e.to_string()),
        DecodingError::LimitsExceeded => DecodeError::OutOfMemory,
    }
}
