//! End-to-end tests for `trapwatch --write-config`.

use std::process::Command;

use trapwatch::config::{Config, ReconcilePolicy};
use trapwatch::models::TransitionScheme;

/// Path to the trapwatch binary
fn trapwatch_bin() -> String {
    std::env::var("CARGO_BIN_EXE_trapwatch").unwrap_or_else(|_| "target/debug/trapwatch".to_string())
}

#[test]
fn test_write_config_creates_default_file() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("nested").join("config.toml");

    let output = Command::new(trapwatch_bin())
        .arg("--config")
        .arg(&path)
        .args(["--scheme", "cyclic4", "--write-config"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(
        output.status.code(),
        Some(0),
        "Write config should succeed. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config = Config::load_from(&path).expect("Written config should load");
    assert_eq!(config.dashboard.transition_scheme, TransitionScheme::Cyclic4);
    assert_eq!(config.dashboard.reconcile, ReconcilePolicy::Off);
    assert_eq!(config.detector.candidate_ports, vec![5001, 5000, 5002, 8000]);
    assert!(!path.with_extension("toml.tmp").exists());
}

#[test]
fn test_write_config_rejects_invalid_file() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[detector]\ncandidate_ports = []\n").unwrap();

    let output = Command::new(trapwatch_bin())
        .arg("--config")
        .arg(&path)
        .arg("--write-config")
        .output()
        .expect("Failed to execute command");

    assert_ne!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stderr).contains("candidate_ports"));
}
