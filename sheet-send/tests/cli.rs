//! Command-line behaviour of sheet-send that needs no network access

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn sheet_send() -> Command {
    let mut cmd = Command::cargo_bin("sheet-send").unwrap();
    cmd.env_remove("SHEETCAST_CONFIG")
        .env_remove("SHEETCAST_LOG_FORMAT")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_describes_summary_and_exit_codes() {
    sheet_send()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Posts processed successfully"))
        .stdout(predicate::str::contains("EXIT CODES"));
}

#[test]
fn test_invalid_config_file_exits_2() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[ledger\ndocument = ").unwrap();

    sheet_send()
        .arg("--config")
        .arg(&path)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Error: Configuration error"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_invalid_config_via_env_exits_2() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[ledger]\ndocument = \"\"\n").unwrap();

    sheet_send()
        .env("SHEETCAST_CONFIG", &path)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("ledger.document"));
}

#[test]
fn test_missing_explicit_config_exits_2() {
    let dir = TempDir::new().unwrap();

    sheet_send()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_zero_interval_exits_3() {
    sheet_send()
        .args(["--interval", "0"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Error: Invalid input"));
}

#[test]
fn test_unparseable_interval_exits_3() {
    sheet_send()
        .args(["--interval", "soon"])
        .assert()
        .failure()
        .code(3);
}

#[test]
fn test_unknown_log_format_is_rejected() {
    sheet_send()
        .args(["--log-format", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid log format"));
}

#[test]
fn test_missing_key_file_exits_2() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    let lock_path = dir.path().join("sweep.lock");
    fs::write(
        &config_path,
        format!(
            "[credentials]\nsource = \"key_file\"\nkey_file = \"{}\"\n\n[lock]\npath = \"{}\"\n",
            dir.path().join("missing.json").display().to_string().replace('\\', "/"),
            lock_path.display().to_string().replace('\\', "/"),
        ),
    )
    .unwrap();

    sheet_send()
        .arg("--config")
        .arg(&config_path)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Credential error"));

    // The lock is released even when the sweep fails
    assert!(!lock_path.exists());
}

#[test]
fn test_held_lock_exits_1_without_touching_credentials() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    let lock_path = dir.path().join("sweep.lock");
    fs::write(&lock_path, "pid=1\n").unwrap();
    fs::write(
        &config_path,
        format!(
            "[credentials]\nsource = \"key_file\"\nkey_file = \"/nonexistent.json\"\n\n[lock]\npath = \"{}\"\n",
            lock_path.display().to_string().replace('\\', "/"),
        ),
    )
    .unwrap();

    sheet_send()
        .arg("--config")
        .arg(&config_path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Sweep already running"));

    assert!(lock_path.exists());
}
