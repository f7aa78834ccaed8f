// NUFLIX Speedcode - Cycle-exact raster code generation for the Commodore 64
// Copyright (C) 2026  Marcel Joachim Kloubert <marcel@kloubert.dev>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! End-to-end CLI integration tests.

use std::path::{Path, PathBuf};
use std::process::Command;

use nuflix_speedcode::codegen::constants::CODE_SIZE_LIMIT;
use nuflix_speedcode::codegen::emit::SlowValues;
use nuflix_speedcode::{generate_from_frame, Frame, GenerationOptions};
use tempfile::TempDir;

fn cargo_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_nuflix-speedcode"))
}

/// Write a blank frame description into `dir`.
fn blank_frame_file(dir: &Path) -> PathBuf {
    let path = dir.join("frame.json");
    std::fs::write(&path, Frame::blank().to_json().unwrap()).unwrap();
    path
}

fn expected_code() -> Vec<u8> {
    generate_from_frame(&Frame::blank(), &SlowValues::default(), GenerationOptions::default())
        .unwrap()
        .code
}

/// Test --help flag.
#[test]
fn test_help_flag() {
    let output = cargo_bin()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("nuflix-speedcode"));
    assert!(stdout.contains("--output"));
    assert!(stdout.contains("--ntsc"));
    assert!(stdout.contains("--slow-values"));
}

/// Test --version flag.
#[test]
fn test_version_flag() {
    let output = cargo_bin()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("nuflix-speedcode"));
    assert!(stdout.contains("0.1.0"));
}

/// Test generating a padded PRG.
#[test]
fn test_generate_prg() {
    let dir = TempDir::new().unwrap();
    let input = blank_frame_file(dir.path());
    let output_path = dir.path().join("speedcode.prg");

    let output = cargo_bin()
        .arg(&input)
        .arg("-o")
        .arg(&output_path)
        .output()
        .expect("Failed to execute command");

    assert!(
        output.status.success(),
        "Generation failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let data = std::fs::read(&output_path).unwrap();
    assert_eq!(data.len(), CODE_SIZE_LIMIT + 2);
    assert_eq!(data[0], 0x00, "Load address low byte");
    assert_eq!(data[1], 0x10, "Load address high byte");

    let code = expected_code();
    assert_eq!(&data[2..2 + code.len()], &code[..]);
    assert!(data[2 + code.len()..].iter().all(|&b| b == 0));
}

/// Test generating raw code without padding.
#[test]
fn test_generate_bin_without_padding() {
    let dir = TempDir::new().unwrap();
    let input = blank_frame_file(dir.path());
    let output_path = dir.path().join("speedcode.bin");

    let output = cargo_bin()
        .arg(&input)
        .arg("-o")
        .arg(&output_path)
        .arg("--no-pad")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    assert_eq!(std::fs::read(&output_path).unwrap(), expected_code());
}

/// Test NTSC output.
#[test]
fn test_generate_ntsc() {
    let dir = TempDir::new().unwrap();
    let input = blank_frame_file(dir.path());
    let output_path = dir.path().join("ntsc.bin");

    let output = cargo_bin()
        .arg(&input)
        .arg("-o")
        .arg(&output_path)
        .arg("--ntsc")
        .arg("--no-pad")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let expected =
        generate_from_frame(&Frame::blank(), &SlowValues::default(), GenerationOptions::default())
            .unwrap()
            .ntsc_code()
            .unwrap();
    let data = std::fs::read(&output_path).unwrap();
    assert_eq!(data, expected);
    assert!(data.len() > expected_code().len());
}

/// Test writing the generation log.
#[test]
fn test_generation_log() {
    let dir = TempDir::new().unwrap();
    let input = blank_frame_file(dir.path());
    let output_path = dir.path().join("speedcode.prg");
    let log_path = dir.path().join("speedcode.log");

    let output = cargo_bin()
        .arg(&input)
        .arg("-o")
        .arg(&output_path)
        .arg("--log")
        .arg(&log_path)
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("free cycles = "));
    assert!(log.contains("Resolutions:"));
}

/// Test a custom slow value table.
#[test]
fn test_slow_values_file() {
    let dir = TempDir::new().unwrap();
    let input = blank_frame_file(dir.path());
    let slow_path = dir.path().join("slow.json");
    let output_path = dir.path().join("speedcode.bin");

    let cells: String = (0..=255)
        .map(|value| format!("\"{}\": {}", value, value))
        .collect::<Vec<_>>()
        .join(", ");
    std::fs::write(&slow_path, format!("{{{}}}", cells)).unwrap();

    let output = cargo_bin()
        .arg(&input)
        .arg("-o")
        .arg(&output_path)
        .arg("--slow-values")
        .arg(&slow_path)
        .output()
        .expect("Failed to execute command");

    assert!(
        output.status.success(),
        "Generation failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Test verbose flag.
#[test]
fn test_verbose_output() {
    let dir = TempDir::new().unwrap();
    let input = blank_frame_file(dir.path());
    let output_path = dir.path().join("speedcode.prg");

    let output = cargo_bin()
        .arg("-v")
        .arg(&input)
        .arg("-o")
        .arg(&output_path)
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("NUFLIX Speedcode"));
    assert!(stdout.contains("Output format:"));
    assert!(stdout.contains("Generated"));
    assert!(stdout.contains("bytes"));
}

/// Test error on an unknown output extension.
#[test]
fn test_unknown_output_format() {
    let dir = TempDir::new().unwrap();
    let input = blank_frame_file(dir.path());

    let output = cargo_bin()
        .arg(&input)
        .arg("-o")
        .arg(dir.path().join("speedcode.txt"))
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown output format"));
}

/// Test error on a missing input file.
#[test]
fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();

    let output = cargo_bin()
        .arg(dir.path().join("missing.json"))
        .arg("-o")
        .arg(dir.path().join("speedcode.prg"))
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Cannot read"));
}

/// Test error on a frame with the wrong geometry.
#[test]
fn test_invalid_frame() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("short.json");
    let mut frame = Frame::blank();
    frame.border_colors.pop();
    std::fs::write(&input, serde_json::to_string(&frame).unwrap()).unwrap();

    let output = cargo_bin()
        .arg(&input)
        .arg("-o")
        .arg(dir.path().join("speedcode.prg"))
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("border_colors"));
}

/// Test error on missing output flag.
#[test]
fn test_missing_output_flag() {
    let output = cargo_bin()
        .arg("frame.json")
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--output"));
}
