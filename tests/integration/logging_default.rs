//! Integration tests for the CLI binary's logging and exit behaviour.
//!
//! Every run here fails validation (no API keys), so nothing touches the network.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_augur(temp_dir: &TempDir, args: &[&str]) -> Output {
    let home = temp_dir.path().join("home");
    let data_home = temp_dir.path().join("data");
    let workspace = temp_dir.path().join("ws");
    fs::create_dir_all(&home).unwrap();
    fs::create_dir_all(&workspace).unwrap();

    Command::new(env!("CARGO_BIN_EXE_augur"))
        .env("HOME", home.as_os_str())
        .env("XDG_DATA_HOME", data_home.as_os_str())
        .env_remove("OPENAI_API_KEY")
        .env_remove("NEWSAPI_KEY")
        .env_remove("AUGUR_ENV")
        .env_remove("AUGUR_LOG")
        .env_remove("AUGUR_LOG_FORMAT")
        .env_remove("AUGUR_LOG_OUTPUT")
        .arg("--workspace")
        .arg(&workspace)
        .args(args)
        .output()
        .unwrap()
}

/// Matches resolve_log_file_path in src/logging.rs: ProjectDirs data dir on Linux.
fn expected_log_path(data_home: &Path) -> std::path::PathBuf {
    data_home.join("augur").join("augur.log")
}

#[test]
fn test_missing_keys_exit_nonzero() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_augur(&temp_dir, &["--quiet", "run"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Configuration problem"), "stderr: {}", stderr);
    assert!(stderr.contains("api_key"), "stderr: {}", stderr);
    assert!(!temp_dir.path().join("ws").join(".augur").exists());
}

#[cfg(target_os = "linux")]
#[test]
fn test_file_output_uses_default_log_path() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_augur(&temp_dir, &["--log-output", "file", "run"]);

    assert!(!output.status.success());
    let log_path = expected_log_path(&temp_dir.path().join("data"));
    let contents = fs::read_to_string(&log_path)
        .unwrap_or_else(|e| panic!("expected log file at {:?}: {}", log_path, e));
    assert!(contents.contains("Augur CLI starting"));
    assert!(String::from_utf8_lossy(&output.stdout).trim().is_empty());
}

#[test]
fn test_explicit_log_file_in_json() {
    let temp_dir = TempDir::new().unwrap();
    let log_file = temp_dir.path().join("logs").join("run.log");
    let output = run_augur(
        &temp_dir,
        &[
            "--log-output",
            "file",
            "--log-format",
            "json",
            "--log-file",
            log_file.to_str().unwrap(),
            "run",
        ],
    );

    assert!(!output.status.success());
    let contents = fs::read_to_string(&log_file).unwrap();
    let first = contents.lines().next().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(first).unwrap();
    assert_eq!(parsed["fields"]["message"], "Augur CLI starting");
}

#[test]
fn test_quiet_writes_no_log_file() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_augur(&temp_dir, &["--quiet", "--log-output", "file", "run"]);

    assert!(!output.status.success());
    assert!(!expected_log_path(&temp_dir.path().join("data")).exists());
}
