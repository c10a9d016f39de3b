//! Integration tests for the mkfw and fwinfo binaries
//!
//! Runs the built executables against generated inputs and checks exit codes
//! and output bytes.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

const TILE_BYTES: usize = 86 * 48 * 2;
const PARTITIONS_OFFSET: usize = 24 + 40 + TILE_BYTES;

fn mkfw(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mkfw"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to run mkfw")
}

fn fwinfo(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fwinfo"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to run fwinfo")
}

/// Process exit codes are truncated to a byte on Unix.
fn assert_exit(output: &Output, code: i32) {
    let actual = output.status.code().expect("Process was killed");
    assert!(
        actual == code || actual == code & 0xFF,
        "expected exit code {}, got {}\nstderr: {}",
        code,
        actual,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn write_inputs(dir: &Path) {
    std::fs::write(dir.join("tile.raw"), vec![0x11; TILE_BYTES]).unwrap();
    std::fs::write(dir.join("firmware.bin"), vec![0x22; 12345]).unwrap();
}

#[test]
fn test_demo_image_default_output() {
    let dir = tempdir().expect("Failed to create temp dir");
    write_inputs(dir.path());

    let output = mkfw(
        dir.path(),
        &["demo", "tile.raw", "app", "ota_0", "auto", "main", "firmware.bin"],
    );
    assert_exit(&output, 0);

    let data = std::fs::read(dir.path().join("firmware.fw")).expect("Output should exist");
    assert_eq!(data.len(), PARTITIONS_OFFSET + 28 + 4 + 12345 + 4);
    assert_eq!(&data[..24], b"ODROIDGO_FIRMWARE_V00_01");
    assert_eq!(&data[24..28], b"demo");
    assert_eq!(data[PARTITIONS_OFFSET + 1], 0x10);

    let (body, trailer) = data.split_at(data.len() - 4);
    assert_eq!(
        u32::from_le_bytes(trailer.try_into().unwrap()),
        crc32fast::hash(body)
    );
}

#[test]
fn test_custom_header_and_output() {
    let dir = tempdir().expect("Failed to create temp dir");
    write_inputs(dir.path());

    let output = mkfw(
        dir.path(),
        &["-q", "-H", "HDR", "-o", "out.fw", "demo", "tile.raw"],
    );
    assert_exit(&output, 0);

    let data = std::fs::read(dir.path().join("out.fw")).unwrap();
    assert_eq!(&data[..4], b"HDR\0");
    assert_eq!(data.len(), PARTITIONS_OFFSET + 4);
}

#[test]
fn test_png_tile() {
    let dir = tempdir().expect("Failed to create temp dir");
    write_inputs(dir.path());
    {
        let file = std::fs::File::create(dir.path().join("tile.png")).unwrap();
        let mut encoder = png::Encoder::new(file, 86, 48);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(&vec![0xFF; 86 * 48 * 3]).unwrap();
    }

    let output = mkfw(dir.path(), &["white", "tile.png"]);
    assert_exit(&output, 0);

    let data = std::fs::read(dir.path().join("firmware.fw")).unwrap();
    assert!(data[64..64 + TILE_BYTES].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_oversized_png_tile_is_invalid_params() {
    let dir = tempdir().expect("Failed to create temp dir");
    write_inputs(dir.path());

    // IHDR for 40000x40000 RGBA8 followed by an empty IDAT
    let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&40000u32.to_be_bytes());
    ihdr.extend_from_slice(&40000u32.to_be_bytes());
    ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);
    for (kind, data) in [(b"IHDR", &ihdr[..]), (b"IDAT", &[][..]), (b"IEND", &[][..])] {
        png.extend_from_slice(&(data.len() as u32).to_be_bytes());
        let start = png.len();
        png.extend_from_slice(kind);
        png.extend_from_slice(data);
        let crc = crc32fast::hash(&png[start..]);
        png.extend_from_slice(&crc.to_be_bytes());
    }
    std::fs::write(dir.path().join("huge.png"), png).unwrap();

    let output = mkfw(dir.path(), &["demo", "huge.png"]);
    assert_exit(&output, -1);
}

#[test]
fn test_output_without_fw_extension_warns() {
    let dir = tempdir().expect("Failed to create temp dir");
    write_inputs(dir.path());

    let output = mkfw(dir.path(), &["-o", "image.bin", "demo", "tile.raw"]);
    assert_exit(&output, 0);
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not use the .fw extension"));
    assert!(dir.path().join("image.bin").exists());
}

#[test]
fn test_misaligned_length_is_invalid_params() {
    let dir = tempdir().expect("Failed to create temp dir");
    write_inputs(dir.path());

    let output = mkfw(
        dir.path(),
        &["demo", "tile.raw", "app", "factory", "100000", "main", "firmware.bin"],
    );
    assert_exit(&output, -1);
}

#[test]
fn test_incomplete_partition_is_invalid_params() {
    let dir = tempdir().expect("Failed to create temp dir");
    write_inputs(dir.path());

    let output = mkfw(dir.path(), &["demo", "tile.raw", "app", "factory"]);
    assert_exit(&output, -1);
}

#[test]
fn test_missing_binary_is_read_error() {
    let dir = tempdir().expect("Failed to create temp dir");
    write_inputs(dir.path());

    let output = mkfw(
        dir.path(),
        &["demo", "tile.raw", "app", "factory", "auto", "main", "missing.bin"],
    );
    assert_exit(&output, -2);
}

#[test]
fn test_unwritable_output_is_write_error() {
    let dir = tempdir().expect("Failed to create temp dir");
    write_inputs(dir.path());

    let output = mkfw(
        dir.path(),
        &["-o", "no/such/dir/out.fw", "demo", "tile.raw"],
    );
    assert_exit(&output, -3);
}

#[test]
fn test_unknown_option_is_invalid_params() {
    let dir = tempdir().expect("Failed to create temp dir");
    let output = mkfw(dir.path(), &["--bogus"]);
    assert_exit(&output, -1);
}

#[test]
fn test_help_and_version_succeed() {
    let dir = tempdir().expect("Failed to create temp dir");
    assert_exit(&mkfw(dir.path(), &["--help"]), 0);

    let output = mkfw(dir.path(), &["-V"]);
    assert_exit(&output, 0);
    assert!(String::from_utf8_lossy(&output.stdout).contains("mkfw"));
}

#[test]
fn test_manifest_build() {
    let dir = tempdir().expect("Failed to create temp dir");
    let project = dir.path().join("project");
    std::fs::create_dir(&project).unwrap();
    write_inputs(&project);
    std::fs::write(
        project.join("mkfw.toml"),
        r#"
[firmware]
description = "from manifest"
tile = "tile.raw"
output = "manifest.fw"

[[partitions]]
type = "app"
subtype = "factory"
label = "main"
file = "firmware.bin"
"#,
    )
    .unwrap();

    // run from the parent directory so relative paths must resolve via the manifest
    let output = mkfw(dir.path(), &["-m", "project/mkfw.toml"]);
    assert_exit(&output, 0);

    let data = std::fs::read(project.join("manifest.fw")).unwrap();
    assert_eq!(&data[24..37], b"from manifest");
    assert_eq!(data.len(), PARTITIONS_OFFSET + 28 + 4 + 12345 + 4);
}

#[test]
fn test_missing_manifest_is_read_error() {
    let dir = tempdir().expect("Failed to create temp dir");
    let output = mkfw(dir.path(), &["-m", "nope.toml"]);
    assert_exit(&output, -2);
}

#[test]
fn test_fwinfo_verifies_image() {
    let dir = tempdir().expect("Failed to create temp dir");
    write_inputs(dir.path());
    assert_exit(
        &mkfw(
            dir.path(),
            &["demo", "tile.raw", "data", "phy", "64K", "phy_init", "firmware.bin"],
        ),
        0,
    );

    let output = fwinfo(dir.path(), &["firmware.fw"]);
    assert_exit(&output, 0);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("demo"));
    assert!(stdout.contains("phy_init"));
    assert!(stdout.contains("actual=12345"));

    // flip a payload byte
    let path = dir.path().join("firmware.fw");
    let mut data = std::fs::read(&path).unwrap();
    data[PARTITIONS_OFFSET + 40] ^= 0xFF;
    std::fs::write(&path, data).unwrap();

    assert_exit(&fwinfo(dir.path(), &["firmware.fw"]), -2);
}
