//! Error type shared by every stage of image assembly.
//!
//! Every failure is fatal. [`FirmwareError::kind`] sorts each variant into
//! one of three classes that callers map onto process exit codes.

use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FirmwareError>;

/// Coarse failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-range input
    InvalidParams,
    /// A tile or partition file could not be read or decoded
    Read,
    /// The output sink rejected a write
    Write,
}

impl ErrorKind {
    /// Process exit code for this class.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::InvalidParams => -1,
            ErrorKind::Read => -2,
            ErrorKind::Write => -3,
        }
    }
}

/// Which textual partition field a parse error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionField {
    Type,
    Subtype,
    Length,
}

impl std::fmt::Display for PartitionField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PartitionField::Type => "type",
            PartitionField::Subtype => "subtype",
            PartitionField::Length => "size",
        })
    }
}

/// Reasons the PNG collaborator can give up on a tile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("out of memory")]
    OutOfMemory,

    #[error("file not found")]
    NotFound,

    #[error("bad PNG header: {0}")]
    BadHeader(String),

    #[error("malformed PNG data: {0}")]
    Malformed(String),

    #[error("unsupported PNG format: {0}")]
    UnsupportedFormat(String),

    #[error("interlaced PNG images are not supported")]
    InterlacedUnsupported,

    #[error("image is {width}x{height}")]
    Dimensions { width: u32, height: u32 },

    #[error("bad decoder parameter: {0}")]
    BadParameter(String),
}

/// Everything that can abort image assembly or inspection.
#[derive(Debug, thiserror::Error)]
pub enum FirmwareError {
    // --- invalid parameters ---
    #[error("Could not parse partition {index} {field}: {text}")]
    Unparsable {
        index: usize,
        field: PartitionField,
        text: String,
    },

    #[error("Partition {index} {field} is too large: {text}")]
    TooLarge {
        index: usize,
        field: PartitionField,
        text: String,
    },

    #[error("Could not parse partition {index} size suffix: {text}")]
    BadSuffix { index: usize, text: String },

    #[error(
        "Partition type {text} is reserved, please use app (0), data (1) or a type >= 0x40 for partition {index}"
    )]
    ReservedType { index: usize, text: String },

    #[error("Invalid subtype for partition {index}: {text} ({reason})")]
    InvalidSubtype {
        index: usize,
        text: String,
        reason: &'static str,
    },

    #[error("Partition {index} size is not aligned to 64K: {length}")]
    Misaligned { index: usize, length: u32 },

    #[error(
        "Actual partition size: {actual} is larger than the declared size: {declared} for partition {index}"
    )]
    FileTooLarge {
        index: usize,
        actual: u64,
        declared: u32,
    },

    #[error("Missing partition {index} {what}")]
    MissingArgument { index: usize, what: &'static str },

    #[error("Tile image must be {expected_width}x{expected_height}, got {width}x{height}")]
    TileDimensions {
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    #[error("Tile file is too small. Expected {expected} bytes, got {actual}: {path}")]
    TileTooSmall {
        path: PathBuf,
        expected: usize,
        actual: u64,
    },

    #[error("Tile file is too large. Expected {expected} bytes, got {actual}: {path}")]
    TileTooLarge {
        path: PathBuf,
        expected: usize,
        actual: u64,
    },

    #[error("Tile pixel buffer holds {actual} bytes, {format} at this size needs {expected}")]
    PixelBufferSize {
        format: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Unsupported tile pixel format: {0}")]
    UnsupportedPixelFormat(String),

    // --- read errors ---
    #[error("Could not read {what}: {path}")]
    Read {
        what: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not decode tile image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("Invalid firmware image: {0}")]
    MalformedImage(String),

    #[error("Checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    // --- write errors ---
    #[error("Could not write {what} to firmware file")]
    Write {
        what: String,
        #[source]
        source: std::io::Error,
    },
}

impl FirmwareError {
    /// Failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FirmwareError::Read { .. }
            | FirmwareError::Decode { .. }
            | FirmwareError::MalformedImage(_)
            | FirmwareError::ChecksumMismatch { .. } => ErrorKind::Read,
            FirmwareError::Write { .. } => ErrorKind::Write,
            _ => ErrorKind::InvalidParams,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }

    pub(crate) fn read(
        what: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        FirmwareError::Read {
            what: what.into(),
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(what: impl Into<String>, source: std::io::Error) -> Self {
        FirmwareError::Write {
            what: what.into(),
            source,
        }
    }
}
