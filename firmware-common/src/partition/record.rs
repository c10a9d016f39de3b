//! On-disk partition record (28 bytes)
//!
//! # Layout
//! ```text
//! 0x00: type      u8
//! 0x01: subtype   u8
//! 0x02: reserved  u8   (always 0)
//! 0x03: reserved  u8   (always 0)
//! 0x04: label     [u8; 16]  zero-padded, not necessarily terminated
//! 0x14: flags     u32 LE    (always 0)
//! 0x18: length    u32 LE    resolved capacity
//! ```
//!
//! The record is always followed by the real backing-file size (u32 LE) and
//! then the file contents; those are not part of the record itself.

use crate::format::{field_text, fixed_field};

use super::PartitionSpec;

/// Size of an encoded record.
pub const RECORD_SIZE: usize = 28;

/// Width of the label field.
pub const LABEL_SIZE: usize = 16;

/// Partition record as stored in the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionRecord {
    pub partition_type: u8,
    pub subtype: u8,
    pub label: [u8; LABEL_SIZE],
    pub flags: u32,
    /// Declared capacity after resolution
    pub length: u32,
}

impl PartitionRecord {
    /// Build the record for a validated spec and its resolved length.
    pub fn new(spec: &PartitionSpec, resolved_length: u32) -> Self {
        Self {
            partition_type: spec.partition_type.code(),
            subtype: spec.subtype,
            label: fixed_field(spec.label.as_bytes()),
            flags: 0,
            length: resolved_length,
        }
    }

    /// Write record to bytes
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[0] = self.partition_type;
        bytes[1] = self.subtype;
        bytes[4..20].copy_from_slice(&self.label);
        bytes[20..24].copy_from_slice(&self.flags.to_le_bytes());
        bytes[24..28].copy_from_slice(&self.length.to_le_bytes());
        bytes
    }

    /// Read record from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < RECORD_SIZE {
            return None;
        }
        let mut label = [0u8; LABEL_SIZE];
        label.copy_from_slice(&bytes[4..20]);
        Some(Self {
            partition_type: bytes[0],
            subtype: bytes[1],
            label,
            flags: u32::from_le_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]),
            length: u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
        })
    }

    /// Label as text, up to the first zero byte.
    pub fn label_text(&self) -> String {
        field_text(&self.label)
    }
}

/// Encode a spec and its resolved length into the 28-byte on-disk form.
pub fn encode(spec: &PartitionSpec, resolved_length: u32) -> [u8; RECORD_SIZE] {
    PartitionRecord::new(spec, resolved_length).to_bytes()
}
