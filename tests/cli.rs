//! Command-line smoke tests.

use std::fs;
use std::process::Command;

fn bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_scene-accel"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let out = bin().arg("help").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("demo"));
    assert!(stdout.contains("config"));
}

#[test]
fn test_demo_prints_stats_and_dumps() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid.sbvh");
    let out = bin()
        .args(["-q", "demo", "--grid", "3", "--out"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Instances:       10"));
    assert!(stdout.contains("Lights:          1"));
    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[..4], b"SBVH");
}

#[test]
fn test_config_echoes_valid_options() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("opts.json");
    fs::write(&path, r#"{ "max_items_per_leaf": 2 }"#).unwrap();

    let out = bin().arg("config").arg(&path).output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("\"max_items_per_leaf\": 2"));
    assert!(stdout.contains("\"blas_bins\": 12"));
}

#[test]
fn test_config_rejects_invalid_options() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{ "max_texture_width": 100000 }"#).unwrap();

    let out = bin().arg("config").arg(&path).output().unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("max_texture_width"));
}

#[test]
fn test_demo_honors_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.json");
    fs::write(&path, r#"{ "max_texture_width": 4 }"#).unwrap();

    let out = bin()
        .args(["-q", "--config"])
        .arg(&path)
        .args(["demo", "--grid", "2"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("texture width"));
}

#[test]
fn test_unknown_command_fails() {
    let out = bin().arg("frobnicate").output().unwrap();
    assert!(!out.status.success());
}
