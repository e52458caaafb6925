//! CLI smoke tests for the lease-demo binary
//!
//! Every run gets its own temporary home directory and a console-only
//! logging section so nothing is written outside the temp dir.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn write_config(dir: &Path, storage: &str) -> PathBuf {
    let home = dir.join("home");
    let path = dir.join("lease-demo.yaml");
    let yaml = format!(
        r#"
home_dir: "{}"
storage:
{}
logging:
  default:
    console_level: warn
    file: ""
"#,
        home.display(),
        storage
    );
    std::fs::write(&path, yaml).expect("write config");
    path
}

/// Helper to run the lease-demo binary with given arguments
fn run_lease_demo(home: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_lease-demo"))
        .args(args)
        .env("HOME", home)
        .env("APPDATA", home)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute lease-demo")
}

#[test]
fn test_cli_help_command() {
    let tmp = TempDir::new().unwrap();
    let output = run_lease_demo(tmp.path(), &["--help"]);

    assert!(output.status.success(), "Help command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("lease-demo"), "Should contain binary name");
    assert!(stdout.contains("Usage:"), "Should contain usage information");
    assert!(stdout.contains("scenario"), "Should contain 'scenario' subcommand");
    assert!(stdout.contains("check"), "Should contain 'check' subcommand");
    assert!(stdout.contains("--config"), "Should mention config option");
    assert!(stdout.contains("--backend"), "Should mention backend option");
}

#[test]
fn test_cli_version_command() {
    let tmp = TempDir::new().unwrap();
    let output = run_lease_demo(tmp.path(), &["--version"]);

    assert!(output.status.success(), "Version command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("lease-demo"));
    assert!(stdout.contains("0.1.0"));
}

#[test]
fn test_cli_invalid_command() {
    let tmp = TempDir::new().unwrap();
    let output = run_lease_demo(tmp.path(), &["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid-command") || stderr.contains("unrecognized"));
}

#[test]
fn test_cli_invalid_backend() {
    let tmp = TempDir::new().unwrap();
    let output = run_lease_demo(tmp.path(), &["--backend", "postgres", "check"]);

    assert!(!output.status.success(), "Unknown backend should be rejected");
}

#[test]
fn test_cli_print_config_applies_backend_override() {
    let tmp = TempDir::new().unwrap();
    let cfg = write_config(tmp.path(), "  backend: hierarchical");
    let output = run_lease_demo(
        tmp.path(),
        &[
            "--config",
            cfg.to_str().unwrap(),
            "--backend",
            "single-table",
            "--print-config",
        ],
    );

    assert!(output.status.success(), "print-config should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("backend: single_table"), "stdout: {stdout}");
    assert!(stdout.contains("table_name: leases"));
}

#[test]
fn test_cli_check_command() {
    let tmp = TempDir::new().unwrap();
    let cfg = write_config(tmp.path(), "  backend: single_table\n  table_name: grants");
    let output = run_lease_demo(tmp.path(), &["--config", cfg.to_str().unwrap(), "check"]);

    assert!(output.status.success(), "check should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration check passed"));
    assert!(stdout.contains("table_name: grants"));
    assert!(tmp.path().join("home").is_dir(), "home_dir is created");
}

#[test]
fn test_cli_check_rejects_unknown_storage_key() {
    let tmp = TempDir::new().unwrap();
    let cfg = write_config(tmp.path(), "  retention: 1h");
    let output = run_lease_demo(tmp.path(), &["--config", cfg.to_str().unwrap(), "check"]);

    assert!(!output.status.success(), "unknown storage key should fail");
}

#[test]
fn test_cli_scenario_on_both_backends() {
    for (storage, backend) in [
        ("  backend: hierarchical", "hierarchical"),
        (
            "  backend: single_table\n  index_propagation_delay: 50ms",
            "single_table",
        ),
    ] {
        let tmp = TempDir::new().unwrap();
        let cfg = write_config(tmp.path(), storage);
        let output = run_lease_demo(tmp.path(), &["--config", cfg.to_str().unwrap(), "scenario"]);

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(
            output.status.success(),
            "{backend}: scenario failed\nstdout: {stdout}\nstderr: {stderr}"
        );
        assert!(stdout.contains(&format!("Backend: {backend}")));
        assert!(stdout.contains("Created user John Doe <john@x.com>"));
        assert!(stdout.contains("Created resource sensitive-service"));
        assert!(stdout.contains("Leases by user: 1"), "{backend}: {stdout}");
        assert!(stdout.contains("Leases by resource: 1"), "{backend}: {stdout}");
        assert!(stdout.contains("pending=true"));
        assert!(stdout.contains("Collected 0 expired leases"));
    }
}

#[test]
fn test_cli_scenario_rejects_out_of_range_hours() {
    for hours in ["9999999999999", "2000000", "0"] {
        let tmp = TempDir::new().unwrap();
        let cfg = write_config(tmp.path(), "  backend: hierarchical");
        let output = run_lease_demo(
            tmp.path(),
            &["--config", cfg.to_str().unwrap(), "scenario", "--hours", hours],
        );

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(!output.status.success(), "--hours {hours} should fail");
        assert!(
            !stderr.contains("panicked"),
            "--hours {hours} must fail with an error, not a panic: {stderr}"
        );
        assert!(stderr.contains("Error"), "stderr: {stderr}");
    }
}
