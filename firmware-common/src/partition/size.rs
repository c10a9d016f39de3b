//! Partition length parsing and resolution.

use crate::error::{FirmwareError, PartitionField, Result};
use crate::format::GO_FIRMWARE_FORMAT;

use super::{NumberError, split_number};

/// Declared partition capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionLength {
    /// Literal byte count, a multiple of 64 KiB
    Fixed(u32),
    /// Backing-file size rounded up to the next 64 KiB boundary
    Auto,
}

impl std::fmt::Display for PartitionLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartitionLength::Fixed(length) => write!(f, "{}", length),
            PartitionLength::Auto => f.write_str("auto"),
        }
    }
}

/// Round `value` up to a multiple of `alignment`; aligned values are unchanged.
pub fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

pub(crate) fn check_alignment(index: usize, length: u32) -> Result<()> {
    if length % GO_FIRMWARE_FORMAT.partition_alignment != 0 {
        return Err(FirmwareError::Misaligned { index, length });
    }
    Ok(())
}

/// Parse a length field: `auto`, or a number with an optional `k`/`K` or
/// `m`/`M` multiplier.
pub fn parse_length(index: usize, text: &str) -> Result<PartitionLength> {
    if text == "auto" {
        return Ok(PartitionLength::Auto);
    }

    let too_large = || FirmwareError::TooLarge {
        index,
        field: PartitionField::Length,
        text: text.to_string(),
    };

    let (value, suffix) = split_number(text).map_err(|e| match e {
        NumberError::Empty => FirmwareError::Unparsable {
            index,
            field: PartitionField::Length,
            text: text.to_string(),
        },
        NumberError::Overflow => too_large(),
    })?;

    let multiplier: u64 = match suffix {
        "" => 1,
        "k" | "K" => 1024,
        "m" | "M" => 1024 * 1024,
        _ => {
            return Err(FirmwareError::BadSuffix {
                index,
                text: text.to_string(),
            });
        }
    };

    let length = value
        .checked_mul(multiplier)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(too_large)?;

    check_alignment(index, length)?;
    Ok(PartitionLength::Fixed(length))
}

/// Decide the capacity written into a partition record.
///
/// A fixed length must be 64 KiB aligned and at least `actual_size`. An
/// automatic length is `actual_size` rounded up to the next 64 KiB boundary.
pub fn resolve(index: usize, length: PartitionLength, actual_size: u64) -> Result<u32> {
    match length {
        PartitionLength::Fixed(declared) => {
            check_alignment(index, declared)?;
            if actual_size > declared as u64 {
                return Err(FirmwareError::FileTooLarge {
                    index,
                    actual: actual_size,
                    declared,
                });
            }
            Ok(declared)
        }
        PartitionLength::Auto => {
            let aligned = align_up(actual_size, GO_FIRMWARE_FORMAT.partition_alignment as u64);
            u32::try_from(aligned).map_err(|_| FirmwareError::TooLarge {
                index,
                field: PartitionField::Length,
                text: actual_size.to_string(),
            })
        }
    }
}
