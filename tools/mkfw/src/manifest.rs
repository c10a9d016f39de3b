//! mkfw.toml manifest parsing
//!
//! A manifest describes a whole image so it can be rebuilt without a long
//! command line. Relative paths are resolved against the manifest's directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use firmware_common::PartitionSpec;
use serde::Deserialize;

/// mkfw.toml manifest structure
#[derive(Debug, Deserialize)]
pub struct FirmwareManifest {
    #[serde(default)]
    pub firmware: FirmwareSection,
    #[serde(default)]
    pub partitions: Vec<PartitionEntry>,
}

/// Image-level settings
#[derive(Debug, Default, Deserialize)]
pub struct FirmwareSection {
    /// Defaults to the standard ODROID-GO header
    pub header: Option<String>,
    pub description: Option<String>,
    /// PNG or raw RGB565 tile
    pub tile: Option<String>,
    /// Defaults to firmware.fw
    pub output: Option<String>,
}

/// Single partition entry
#[derive(Debug, Deserialize)]
pub struct PartitionEntry {
    #[serde(rename = "type")]
    pub partition_type: FieldValue,
    pub subtype: FieldValue,
    #[serde(default = "default_length")]
    pub length: FieldValue,
    #[serde(default)]
    pub label: String,
    pub file: String,
}

/// A numeric field written either as a TOML integer or as text
/// (`"app"`, `"0x40"`, `"1M"`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(u64),
    Text(String),
}

impl FieldValue {
    fn to_text(&self) -> String {
        match self {
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

fn default_length() -> FieldValue {
    FieldValue::Text("auto".to_string())
}

impl FirmwareManifest {
    /// Load manifest from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid manifest: {}", path.display()))
    }

    /// Parse manifest from string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse mkfw.toml")
    }

    /// Build partition specs, resolving files against `base_dir`.
    pub fn partition_specs(&self, base_dir: &Path) -> firmware_common::Result<Vec<PartitionSpec>> {
        self.partitions
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                PartitionSpec::parse(
                    index,
                    &entry.partition_type.to_text(),
                    &entry.subtype.to_text(),
                    &entry.length.to_text(),
                    &entry.label,
                    resolve_path(base_dir, &entry.file),
                )
            })
            .collect()
    }
}

/// Join a manifest-relative path onto its directory; absolute paths pass through.
pub fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    base_dir.join(path)
}
