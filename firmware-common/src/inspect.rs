//! Read-only view of an assembled image.

use std::ops::Range;

use crate::error::{FirmwareError, Result};
use crate::format::{
    CHECKSUM_SIZE, DESCRIPTION_SIZE, FILE_SIZE_FIELD, GO_FIRMWARE_FORMAT, HEADER_SIZE, field_text,
};
use crate::partition::{PartitionRecord, RECORD_SIZE};
use crate::pixel::{TILE_BYTES, TileRaster};

/// One partition found in an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionEntry {
    pub record: PartitionRecord,
    /// Real size of the embedded file
    pub actual_size: u32,
    /// Byte range of the payload within the image
    pub payload: Range<usize>,
}

/// A parsed and checksum-verified image.
#[derive(Debug, Clone)]
pub struct FirmwareImage {
    pub header: String,
    pub description: String,
    pub tile: TileRaster,
    pub partitions: Vec<PartitionEntry>,
    pub checksum: u32,
}

impl FirmwareImage {
    /// Parse `bytes` as a complete image and verify its trailing CRC-32.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let min_size = GO_FIRMWARE_FORMAT.partitions_offset() + CHECKSUM_SIZE;
        if bytes.len() < min_size {
            return Err(FirmwareError::MalformedImage(format!(
                "{} bytes is shorter than the minimum image size of {}",
                bytes.len(),
                min_size
            )));
        }

        let body_end = bytes.len() - CHECKSUM_SIZE;
        let (body, trailer) = bytes.split_at(body_end);
        let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let computed = crc32fast::hash(body);
        if stored != computed {
            return Err(FirmwareError::ChecksumMismatch { stored, computed });
        }

        let header = field_text(&body[..HEADER_SIZE]);
        let description = field_text(&body[HEADER_SIZE..HEADER_SIZE + DESCRIPTION_SIZE]);
        let tile_start = HEADER_SIZE + DESCRIPTION_SIZE;
        let tile = TileRaster::from_le_bytes(&body[tile_start..tile_start + TILE_BYTES])
            .ok_or_else(|| FirmwareError::MalformedImage("tile raster is truncated".into()))?;

        let mut partitions = Vec::new();
        let mut offset = GO_FIRMWARE_FORMAT.partitions_offset();
        while offset < body_end {
            let index = partitions.len();
            let entry_end = offset + RECORD_SIZE + FILE_SIZE_FIELD;
            if entry_end > body_end {
                return Err(FirmwareError::MalformedImage(format!(
                    "partition {} record at offset {} is truncated",
                    index, offset
                )));
            }

            let record = PartitionRecord::from_bytes(&body[offset..offset + RECORD_SIZE])
                .ok_or_else(|| {
                    FirmwareError::MalformedImage(format!("partition {index} record is truncated"))
                })?;
            let size_field = &body[offset + RECORD_SIZE..entry_end];
            let actual_size =
                u32::from_le_bytes([size_field[0], size_field[1], size_field[2], size_field[3]]);

            let payload_end = entry_end + actual_size as usize;
            if payload_end > body_end {
                return Err(FirmwareError::MalformedImage(format!(
                    "partition {} declares {} bytes but only {} remain",
                    index,
                    actual_size,
                    body_end - entry_end
                )));
            }

            partitions.push(PartitionEntry {
                record,
                actual_size,
                payload: entry_end..payload_end,
            });
            offset = payload_end;
        }

        Ok(Self {
            header,
            description,
            tile,
            partitions,
            checksum: stored,
        })
    }
}
