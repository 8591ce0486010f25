//! Tests for the command-line binary
//!
//! These run the built `posture-monitor` executable against recorded frames
//! and landmarks in a temporary directory.


use posture_monitor::config::{Config, EXAMPLE_CONFIG};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;
use test_helpers::*;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_posture-monitor"))
        .args(args)
        .output()
        .expect("binary runs")
}

/// Write `count` frames and a matching landmark recording into `dir`
fn write_recording(dir: &Path, count: usize) {
    let frames = dir.join("frames");
    std::fs::create_dir_all(&frames).unwrap();
    for i in 0..count {
        test_frame(32, 24, 90)
            .save(frames.join(format!("frame_{i:03}.png")))
            .unwrap();
    }

    let lines: Vec<String> = (0..count)
        .map(|i| {
            let set = if i % 2 == 0 {
                Some(upright_landmarks())
            } else {
                Some(slouched_landmarks())
            };
            serde_json::to_string(&set).unwrap()
        })
        .collect();
    std::fs::write(dir.join("landmarks.jsonl"), lines.join("\n")).unwrap();
}

/// Quiet, fast configuration exporting into `dir`
fn write_config(dir: &Path) -> std::path::PathBuf {
    let mut config = Config::default();
    config.analysis.skip_frames = 0;
    config.analysis.frame_interval_ms = 0;
    config.analysis.stall_timeout_ms = 0;
    config.alerts.sound_enabled = false;
    config.storage.export_dir = dir.join("exports");
    let path = dir.join("config.yaml");
    config.to_file(&path).unwrap();
    path
}

#[test]
fn test_help_argument() {
    let output = run(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in ["--config", "--cam", "--frames", "--landmarks", "--max-frames", "--export"] {
        assert!(stdout.contains(flag), "help is missing {flag}");
    }
}

#[test]
fn test_print_config() {
    let output = run(&["--print-config"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), EXAMPLE_CONFIG);
}

#[test]
fn test_unknown_export_format_rejected() {
    let output = run(&["--export", "xml", "--print-config"]);
    assert!(!output.status.success());
}

#[test]
fn test_missing_landmarks_fails() {
    let dir = TempDir::new().unwrap();
    write_recording(dir.path(), 2);
    let frames = dir.path().join("frames");

    let output = run(&["--frames", frames.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--landmarks"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "camera:\n  fps: 25\n").unwrap();

    let output = run(&["--config", path.to_str().unwrap(), "--print-config"]);
    // --print-config exits before the configuration is read
    assert!(output.status.success());

    let output = run(&["--config", path.to_str().unwrap()]);
    assert!(!output.status.success());
}

#[test]
fn test_recorded_session_exports_events() {
    let dir = TempDir::new().unwrap();
    write_recording(dir.path(), 4);
    let config = write_config(dir.path());
    let frames = dir.path().join("frames");
    let landmarks = dir.path().join("landmarks.jsonl");

    let output = run(&[
        "--config",
        config.to_str().unwrap(),
        "--frames",
        frames.to_str().unwrap(),
        "--landmarks",
        landmarks.to_str().unwrap(),
        "--max-frames",
        "4",
        "--export",
        "csv",
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let exports: Vec<_> = std::fs::read_dir(dir.path().join("exports"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(exports.len(), 1);

    let mut reader = csv::Reader::from_path(&exports[0]).unwrap();
    assert_eq!(reader.records().count(), 4);
}
