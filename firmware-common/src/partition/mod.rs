//! Partition declarations
//!
//! A partition is declared by five values: type, subtype, length, label and
//! backing file. This module parses the textual forms of the first three,
//! validates them against the reserved ranges, and hands them on to
//! [`size::resolve`] and [`record::PartitionRecord`].

pub mod record;
pub mod size;

use std::path::PathBuf;

use crate::error::{FirmwareError, PartitionField, Result};

pub use record::{LABEL_SIZE, PartitionRecord, RECORD_SIZE};
pub use size::{PartitionLength, align_up, resolve};

/// `app` subtype for the factory image.
pub const APP_FACTORY: u8 = 0x00;
/// First `app` OTA slot (`ota_0`); `ota_15` is `APP_OTA_BASE + 15`.
pub const APP_OTA_BASE: u8 = 0x10;
/// Number of `app` OTA slots.
pub const APP_OTA_SLOTS: u8 = 16;
/// `data` subtypes.
pub const DATA_OTA: u8 = 0;
pub const DATA_PHY: u8 = 1;
pub const DATA_NVS: u8 = 2;

/// Lowest type value available for custom partitions.
pub const CUSTOM_TYPE_MIN: u8 = 0x40;
/// Highest type value available for custom partitions.
pub const CUSTOM_TYPE_MAX: u8 = 0xFE;

/// Partition type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionType {
    /// `app` (0)
    App,
    /// `data` (1)
    Data,
    /// Custom type in 0x40..=0xFE
    Custom(u8),
}

impl PartitionType {
    /// Build from a raw type byte, rejecting the reserved ranges.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(PartitionType::App),
            1 => Some(PartitionType::Data),
            CUSTOM_TYPE_MIN..=CUSTOM_TYPE_MAX => Some(PartitionType::Custom(code)),
            _ => None,
        }
    }

    /// Raw type byte.
    pub fn code(self) -> u8 {
        match self {
            PartitionType::App => 0,
            PartitionType::Data => 1,
            PartitionType::Custom(code) => code,
        }
    }

    /// Check that `subtype` is allowed for this type.
    pub fn check_subtype(self, subtype: u8) -> std::result::Result<(), &'static str> {
        match self {
            PartitionType::App => {
                let ota = APP_OTA_BASE..APP_OTA_BASE + APP_OTA_SLOTS;
                if subtype == APP_FACTORY || ota.contains(&subtype) {
                    Ok(())
                } else {
                    Err("app subtypes can only be 'factory' (0x0), 'ota_0' (0x10) to 'ota_15' (0x1f)")
                }
            }
            PartitionType::Data => {
                if subtype <= DATA_NVS {
                    Ok(())
                } else {
                    Err("data subtypes can only be 'ota' (0), 'phy' (1) or 'nvs' (2)")
                }
            }
            PartitionType::Custom(_) => Ok(()),
        }
    }
}

impl std::fmt::Display for PartitionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartitionType::App => f.write_str("app"),
            PartitionType::Data => f.write_str("data"),
            PartitionType::Custom(code) => write!(f, "{:#04x}", code),
        }
    }
}

/// One partition as declared by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSpec {
    pub partition_type: PartitionType,
    pub subtype: u8,
    pub length: PartitionLength,
    /// Stored in a 16 byte field; longer labels are cut off
    pub label: String,
    /// Backing data
    pub file: PathBuf,
}

impl PartitionSpec {
    /// Parse a partition from its five textual fields.
    ///
    /// `index` is the zero-based partition position, used in error messages.
    pub fn parse(
        index: usize,
        type_text: &str,
        subtype_text: &str,
        length_text: &str,
        label: &str,
        file: impl Into<PathBuf>,
    ) -> Result<Self> {
        let partition_type = parse_type(index, type_text)?;
        let subtype = parse_subtype(index, partition_type, subtype_text)?;
        let length = size::parse_length(index, length_text)?;

        Ok(Self {
            partition_type,
            subtype,
            length,
            label: label.to_string(),
            file: file.into(),
        })
    }

    /// Re-check the invariants of a spec that may have been built by hand.
    pub fn validate(&self, index: usize) -> Result<()> {
        let code = self.partition_type.code();
        if PartitionType::from_code(code) != Some(self.partition_type) {
            return Err(FirmwareError::ReservedType {
                index,
                text: format!("{:#04x}", code),
            });
        }
        self.partition_type
            .check_subtype(self.subtype)
            .map_err(|reason| FirmwareError::InvalidSubtype {
                index,
                text: format!("{:#04x}", self.subtype),
                reason,
            })?;
        if let PartitionLength::Fixed(length) = self.length {
            size::check_alignment(index, length)?;
        }
        Ok(())
    }
}

/// Why a numeric field could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NumberError {
    /// No digits
    Empty,
    /// Does not fit in 64 bits
    Overflow,
}

/// Read a leading decimal or `0x`-prefixed hexadecimal number.
///
/// Returns the value and whatever text follows the digits.
pub(crate) fn split_number(text: &str) -> std::result::Result<(u64, &str), NumberError> {
    let (digits, radix) = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (text, 10),
    };

    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    if end == 0 {
        return Err(NumberError::Empty);
    }

    let mut value: u64 = 0;
    for c in digits[..end].chars() {
        let digit = c.to_digit(radix).ok_or(NumberError::Empty)? as u64;
        value = value
            .checked_mul(radix as u64)
            .and_then(|v| v.checked_add(digit))
            .ok_or(NumberError::Overflow)?;
    }

    Ok((value, &digits[end..]))
}

/// Parse a whole field as a number that must fit into a byte.
fn parse_byte(index: usize, field: PartitionField, text: &str) -> Result<u8> {
    let unparsable = || FirmwareError::Unparsable {
        index,
        field,
        text: text.to_string(),
    };
    let too_large = || FirmwareError::TooLarge {
        index,
        field,
        text: text.to_string(),
    };

    let (value, rest) = split_number(text).map_err(|e| match e {
        NumberError::Empty => unparsable(),
        NumberError::Overflow => too_large(),
    })?;
    if !rest.is_empty() {
        return Err(unparsable());
    }
    u8::try_from(value).map_err(|_| too_large())
}

/// Parse a partition type: `app`, `data`, or a number.
pub fn parse_type(index: usize, text: &str) -> Result<PartitionType> {
    match text {
        "app" => Ok(PartitionType::App),
        "data" => Ok(PartitionType::Data),
        _ => {
            let code = parse_byte(index, PartitionField::Type, text)?;
            PartitionType::from_code(code).ok_or_else(|| FirmwareError::ReservedType {
                index,
                text: text.to_string(),
            })
        }
    }
}

/// Parse a partition subtype for an already parsed type.
///
/// Symbolic names are only recognised for their own type; everything else
/// is read as a number and range-checked.
pub fn parse_subtype(index: usize, partition_type: PartitionType, text: &str) -> Result<u8> {
    let symbolic = match partition_type {
        PartitionType::App => {
            if text == "factory" {
                Some(APP_FACTORY)
            } else if let Some(slot) = text.strip_prefix("ota_") {
                let slot = parse_ota_slot(slot).ok_or_else(|| FirmwareError::InvalidSubtype {
                    index,
                    text: text.to_string(),
                    reason: "should be one of ota_0, ..., ota_15",
                })?;
                Some(APP_OTA_BASE + slot)
            } else {
                None
            }
        }
        PartitionType::Data => match text {
            "ota" => Some(DATA_OTA),
            "phy" => Some(DATA_PHY),
            "nvs" => Some(DATA_NVS),
            _ => None,
        },
        PartitionType::Custom(_) => None,
    };

    if let Some(subtype) = symbolic {
        return Ok(subtype);
    }

    let subtype = parse_byte(index, PartitionField::Subtype, text)?;
    partition_type
        .check_subtype(subtype)
        .map_err(|reason| FirmwareError::InvalidSubtype {
            index,
            text: text.to_string(),
            reason,
        })?;
    Ok(subtype)
}

/// `0`..`15` without leading zeros.
fn parse_ota_slot(text: &str) -> Option<u8> {
    let valid = match text.as_bytes() {
        [d] => d.is_ascii_digit(),
        [b'1', d] => (b'0'..=b'5').contains(d),
        _ => false,
    };
    if valid { text.parse().ok() } else { None }
}
