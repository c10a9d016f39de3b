//! mkfw library
//!
//! Shared pieces of the `mkfw` and `fwinfo` binaries.

pub mod manifest;

use std::path::Path;

use firmware_common::{ErrorKind, FirmwareError, GO_FIRMWARE_FORMAT};
use tracing_subscriber::EnvFilter;

/// Install the log subscriber. `RUST_LOG` wins over `quiet`.
pub fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Whether `path` ends in the firmware image extension (case-insensitive).
pub fn has_firmware_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(GO_FIRMWARE_FORMAT.extension))
}

/// Exit code for a failed run.
///
/// Library errors carry their own class. Anything else is a read error when
/// an I/O failure is somewhere in the chain (e.g. an unreadable manifest) and
/// invalid parameters otherwise.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(firmware) = err.chain().find_map(|e| e.downcast_ref::<FirmwareError>()) {
        return firmware.exit_code();
    }
    if err.chain().any(|e| e.is::<std::io::Error>()) {
        return ErrorKind::Read.exit_code();
    }
    ErrorKind::InvalidParams.exit_code()
}
