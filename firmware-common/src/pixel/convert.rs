//! Source image to RGB565 tile conversion.
//!
//! Each [`PixelFormat`] has its own per-pixel rule; [`convert`] picks the rule
//! once and then maps source pixel `i` to tile pixel `i` for the whole raster.
//! Colour channels are composited against black using the alpha channel and
//! truncated to 5 (red, blue) or 6 (green) bits. Gray levels are expanded to
//! RGB565 by bit replication.

use crate::error::{FirmwareError, Result};
use crate::format::GO_FIRMWARE_FORMAT;

use super::{DecodedImage, PixelFormat, TILE_PIXELS, TileRaster};

pub const BLACK: u16 = 0x0000;
pub const WHITE: u16 = 0xFFFF;

/// LUMINANCE2 palette: black, dark gray, light gray, white.
const LUMINANCE2_PALETTE: [u16; 4] = [gray565(0), gray565(10), gray565(21), gray565(31)];

/// LUMINANCE_ALPHA2 palette, indexed by `luminance * alpha` (0..=9).
///
/// NOTE: multiplying the two 2-bit fields loses most of the alpha precision
/// and leaves entries 5, 7 and 8 unreachable.
const LUMINANCE_ALPHA2_PALETTE: [u16; 10] = [
    gray565(0),
    gray565(3),
    gray565(7),
    gray565(10),
    gray565(14),
    gray565(17),
    gray565(21),
    gray565(24),
    gray565(28),
    gray565(31),
];

/// Convert a decoded source image into the tile raster.
///
/// The source must be exactly tile-sized and hold exactly as many bytes as
/// its format needs for that many pixels.
pub fn convert(image: &DecodedImage) -> Result<TileRaster> {
    if image.width != GO_FIRMWARE_FORMAT.tile_width
        || image.height != GO_FIRMWARE_FORMAT.tile_height
    {
        return Err(FirmwareError::TileDimensions {
            width: image.width,
            height: image.height,
            expected_width: GO_FIRMWARE_FORMAT.tile_width,
            expected_height: GO_FIRMWARE_FORMAT.tile_height,
        });
    }

    let expected = image.format.buffer_size(TILE_PIXELS);
    if image.pixels.len() != expected {
        return Err(FirmwareError::PixelBufferSize {
            format: image.format.name(),
            expected,
            actual: image.pixels.len(),
        });
    }

    let src = image.pixels.as_slice();
    let mut tile = TileRaster::new();
    match image.format {
        PixelFormat::Rgb8 => fill(&mut tile, |i| {
            let p = &src[i * 3..i * 3 + 3];
            rgb8(p[0], p[1], p[2], u8::MAX)
        }),
        PixelFormat::Rgba8 => fill(&mut tile, |i| {
            let p = &src[i * 4..i * 4 + 4];
            rgb8(p[0], p[1], p[2], p[3])
        }),
        PixelFormat::Rgb16 => fill(&mut tile, |i| {
            let s = |c| sample16(src, i * 3 + c);
            rgb16(s(0), s(1), s(2), u16::MAX)
        }),
        PixelFormat::Rgba16 => fill(&mut tile, |i| {
            let s = |c| sample16(src, i * 4 + c);
            rgb16(s(0), s(1), s(2), s(3))
        }),
        PixelFormat::Luminance1 => fill(&mut tile, |i| {
            if sample(src, i, 1) != 0 { WHITE } else { BLACK }
        }),
        PixelFormat::Luminance2 => fill(&mut tile, |i| {
            LUMINANCE2_PALETTE[sample(src, i, 2) as usize]
        }),
        PixelFormat::Luminance4 => fill(&mut tile, |i| nibble_gray(sample(src, i, 4))),
        // NOTE: only the high nibble contributes; the low four bits of every
        // 8-bit sample are discarded.
        PixelFormat::Luminance8 => fill(&mut tile, |i| nibble_gray(src[i] >> 4)),
        PixelFormat::LuminanceAlpha1 => fill(&mut tile, |i| {
            if sample(src, i, 2) == 0b11 { WHITE } else { BLACK }
        }),
        PixelFormat::LuminanceAlpha2 => fill(&mut tile, |i| {
            let la = sample(src, i, 4);
            let (l, a) = (la >> 2, la & 0b11);
            LUMINANCE_ALPHA2_PALETTE[(l * a) as usize]
        }),
        PixelFormat::LuminanceAlpha4 => fill(&mut tile, |i| {
            let (v, a) = (src[i] >> 4, src[i] & 0x0F);
            let c = ((v as u16 * a as u16) << 1) / 7;
            gray565(c.min(0x1F))
        }),
        PixelFormat::LuminanceAlpha8 => fill(&mut tile, |i| {
            let (v, a) = (src[i * 2] as u16, src[i * 2 + 1] as u16);
            gray565((v * a / 255) >> 3)
        }),
    }

    Ok(tile)
}

fn fill(tile: &mut TileRaster, pixel: impl Fn(usize) -> u16) {
    for (i, px) in tile.pixels_mut().iter_mut().enumerate() {
        *px = pixel(i);
    }
}

/// `index`-th `bits`-wide sample of a packed MSB-first stream (`bits` <= 8).
fn sample(src: &[u8], index: usize, bits: usize) -> u8 {
    let bit = index * bits;
    let shift = 8 - bits - bit % 8;
    let mask = ((1u16 << bits) - 1) as u8;
    (src[bit / 8] >> shift) & mask
}

/// `index`-th big-endian 16-bit sample.
fn sample16(src: &[u8], index: usize) -> u16 {
    u16::from_be_bytes([src[index * 2], src[index * 2 + 1]])
}

const fn pack565(r: u16, g: u16, b: u16) -> u16 {
    (r << 11) | (g << 5) | b
}

/// Widen a 5-bit green value to 6 bits by replicating its top bit.
const fn widen_green(g: u16) -> u16 {
    let g = g << 1;
    g | (g >> 5)
}

/// Gray pixel from a 5-bit intensity.
const fn gray565(r: u16) -> u16 {
    pack565(r, widen_green(r), r)
}

/// Gray pixel from a 4-bit intensity.
fn nibble_gray(v: u8) -> u16 {
    let v = v as u16;
    gray565((v << 1) | (v >> 3))
}

fn rgb8(r: u8, g: u8, b: u8, a: u8) -> u16 {
    let blend = |c: u8| (c as u32 * a as u32 / 255) as u16 >> 3;
    pack565(blend(r), widen_green(blend(g)), blend(b))
}

fn rgb16(r: u16, g: u16, b: u16, a: u16) -> u16 {
    let blend = |c: u16| (c as u32 * a as u32 / 65535) as u16 >> 11;
    pack565(blend(r), widen_green(blend(g)), blend(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(format: PixelFormat, pixels: Vec<u8>) -> DecodedImage {
        DecodedImage {
            width: 86,
            height: 48,
            format,
            pixels,
        }
    }

    fn uniform(format: PixelFormat, pixel: &[u8]) -> DecodedImage {
        let pixels = pixel
            .iter()
            .copied()
            .cycle()
            .take(format.buffer_size(TILE_PIXELS))
            .collect();
        image(format, pixels)
    }

    /// Convert a tile where every pixel holds the same samples.
    fn solid(format: PixelFormat, pixel: &[u8]) -> TileRaster {
        convert(&uniform(format, pixel)).unwrap()
    }

    fn assert_all(tile: &TileRaster, expected: u16) {
        assert!(
            tile.pixels().iter().all(|&px| px == expected),
            "expected every pixel to be {expected:#06x}, first is {:#06x}",
            tile.pixels()[0]
        );
    }

    #[test]
    fn test_rgba8_white_is_white() {
        let tile = convert(&uniform(PixelFormat::Rgba8, &[255, 255, 255, 255])).unwrap();
        assert_all(&tile, WHITE);
        assert!(tile.to_le_bytes().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_rgba8_zero_alpha_is_black() {
        let tile = convert(&uniform(PixelFormat::Rgba8, &[255, 128, 7, 0])).unwrap();
        assert_all(&tile, BLACK);
    }

    #[test]
    fn test_rgb8_primaries() {
        assert_all(&solid(PixelFormat::Rgb8, &[255, 0, 0]), 0xF800);
        assert_all(&solid(PixelFormat::Rgb8, &[0, 255, 0]), 0x07E0);
        assert_all(&solid(PixelFormat::Rgb8, &[0, 0, 255]), 0x001F);
    }

    #[test]
    fn test_rgba8_half_alpha() {
        // 255 * 128 / 255 = 128 -> 5 bits = 16, green 16 -> 33
        let tile = convert(&uniform(PixelFormat::Rgba8, &[255, 255, 255, 128])).unwrap();
        assert_all(&tile, pack565(16, 33, 16));
    }

    #[test]
    fn test_rgb16_white_and_alpha() {
        let white = convert(&uniform(PixelFormat::Rgb16, &[0xFF; 6])).unwrap();
        assert_all(&white, WHITE);

        let transparent = convert(&uniform(
            PixelFormat::Rgba16,
            &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00],
        ))
        .unwrap();
        assert_all(&transparent, BLACK);
    }

    #[test]
    fn test_rgb16_uses_high_byte_first() {
        // red = 0x8000 -> 5 bits = 16; a little-endian reading would give 0
        let tile = convert(&uniform(PixelFormat::Rgb16, &[0x80, 0x00, 0, 0, 0, 0])).unwrap();
        assert_all(&tile, pack565(16, 0, 0));
    }

    #[test]
    fn test_luminance1_msb_first() {
        let mut pixels = vec![0u8; 516];
        pixels[0] = 0b1000_0001;
        let tile = convert(&image(PixelFormat::Luminance1, pixels)).unwrap();

        assert_eq!(tile.pixels()[0], WHITE);
        assert!(tile.pixels()[1..7].iter().all(|&px| px == BLACK));
        assert_eq!(tile.pixels()[7], WHITE);
        assert_eq!(tile.pixels()[8], BLACK);
    }

    #[test]
    fn test_luminance2_palette() {
        let mut pixels = vec![0u8; 1032];
        pixels[0] = 0b00_01_10_11;
        let tile = convert(&image(PixelFormat::Luminance2, pixels)).unwrap();

        assert_eq!(tile.pixels()[0], BLACK);
        assert_eq!(tile.pixels()[1], LUMINANCE2_PALETTE[1]);
        assert_eq!(tile.pixels()[2], LUMINANCE2_PALETTE[2]);
        assert_eq!(tile.pixels()[3], WHITE);
        assert!(BLACK < LUMINANCE2_PALETTE[1] && LUMINANCE2_PALETTE[1] < LUMINANCE2_PALETTE[2]);
    }

    #[test]
    fn test_luminance4_expansion() {
        let mut pixels = vec![0u8; 2064];
        pixels[0] = 0xF8;
        let tile = convert(&image(PixelFormat::Luminance4, pixels)).unwrap();

        assert_eq!(tile.pixels()[0], WHITE);
        // v = 8: r = 0b10001, g = 0b100011
        assert_eq!(tile.pixels()[1], pack565(0b10001, 0b100011, 0b10001));
        assert_eq!(tile.pixels()[2], BLACK);
    }

    #[test]
    fn test_luminance8_ignores_low_nibble() {
        let a = convert(&uniform(PixelFormat::Luminance8, &[0x80])).unwrap();
        let b = convert(&uniform(PixelFormat::Luminance8, &[0x8F])).unwrap();
        assert_eq!(a, b);
        assert_all(&solid(PixelFormat::Luminance8, &[0xF0]), WHITE);
    }

    #[test]
    fn test_luminance_alpha1_needs_both_bits() {
        let mut pixels = vec![0u8; 1032];
        pixels[0] = 0b11_10_01_00;
        let tile = convert(&image(PixelFormat::LuminanceAlpha1, pixels)).unwrap();

        assert_eq!(tile.pixels()[0], WHITE);
        assert_eq!(tile.pixels()[1], BLACK);
        assert_eq!(tile.pixels()[2], BLACK);
        assert_eq!(tile.pixels()[3], BLACK);
    }

    #[test]
    fn test_luminance_alpha2_product_index() {
        let mut pixels = vec![0u8; 2064];
        pixels[0] = 0b1111_0111; // (3,3) -> 9, (1,3) -> 3
        pixels[1] = 0b1110_0011; // (3,2) -> 6, (0,3) -> 0
        let tile = convert(&image(PixelFormat::LuminanceAlpha2, pixels)).unwrap();

        assert_eq!(tile.pixels()[0], WHITE);
        assert_eq!(tile.pixels()[1], LUMINANCE_ALPHA2_PALETTE[3]);
        assert_eq!(tile.pixels()[2], LUMINANCE_ALPHA2_PALETTE[6]);
        assert_eq!(tile.pixels()[3], BLACK);
    }

    #[test]
    fn test_luminance_alpha4_saturates() {
        // 15 * 15 * 2 / 7 = 64, clamped to 31
        assert_all(&solid(PixelFormat::LuminanceAlpha4, &[0xFF]), WHITE);
        // 3 * 7 * 2 / 7 = 6
        assert_all(
            &convert(&uniform(PixelFormat::LuminanceAlpha4, &[0x37])).unwrap(),
            gray565(6),
        );
        assert_all(&solid(PixelFormat::LuminanceAlpha4, &[0xF0]), BLACK);
    }

    #[test]
    fn test_luminance_alpha8() {
        assert_all(&solid(PixelFormat::LuminanceAlpha8, &[255, 255]), WHITE);
        assert_all(&solid(PixelFormat::LuminanceAlpha8, &[255, 0]), BLACK);
        // 200 * 100 / 255 = 78 -> 9
        assert_all(
            &convert(&uniform(PixelFormat::LuminanceAlpha8, &[200, 100])).unwrap(),
            gray565(9),
        );
    }

    #[test]
    fn test_wrong_dimensions_rejected() {
        let mut img = uniform(PixelFormat::Rgba8, &[0, 0, 0, 255]);
        img.width = 48;
        img.height = 86;
        assert!(matches!(
            convert(&img).unwrap_err(),
            FirmwareError::TileDimensions {
                width: 48,
                height: 86,
                ..
            }
        ));
    }

    #[test]
    fn test_short_buffer_rejected() {
        let img = image(PixelFormat::Rgb8, vec![0u8; 100]);
        assert!(matches!(
            convert(&img).unwrap_err(),
            FirmwareError::PixelBufferSize { expected: 12384, .. }
        ));
    }
}
