//! Smoke tests -- verify the binary runs and the subcommands are wired up.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn matrixwatch() -> Command {
    let mut cmd = Command::cargo_bin("matrixwatch").unwrap();
    cmd.env_remove("MATRIXWATCH_CONFIG")
        .env_remove("MATRIXWATCH_URL")
        .env_remove("MATRIXWATCH_JOB")
        .env_remove("MATRIXWATCH_USERNAME")
        .env_remove("MATRIXWATCH_API_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    matrixwatch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("CI matrix builds"));
}

#[test]
fn test_cli_version() {
    matrixwatch()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("matrixwatch"));
}

#[test]
fn test_report_subcommand_exists() {
    matrixwatch().args(["report", "--help"]).assert().success();
}

#[test]
fn test_window_uses_configured_zone() {
    matrixwatch()
        .args(["--timezone", "Europe/Berlin", "window"])
        .assert()
        .success()
        .stdout(predicates::str::contains("Europe/Berlin"));
}

#[test]
fn test_show_config_redacts_token() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[jenkins]\napi_token = \"hunter2\"\njob = \"nightly\"").unwrap();

    matrixwatch()
        .arg("--config")
        .arg(file.path())
        .arg("show-config")
        .assert()
        .success()
        .stdout(predicates::str::contains("nightly"))
        .stdout(predicates::str::contains("hunter2").not());
}

#[test]
fn test_report_without_matrix_size_fails() {
    let dir = tempfile::tempdir().unwrap();
    matrixwatch()
        .current_dir(dir.path())
        .arg("report")
        .assert()
        .failure()
        .stderr(predicates::str::contains("number of platform values is unknown"));
}

#[test]
fn test_unreadable_config_env_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    matrixwatch()
        .current_dir(dir.path())
        .env("MATRIXWATCH_CONFIG", "/nonexistent/matrixwatch.toml")
        .arg("window")
        .assert()
        .success()
        .stderr(predicates::str::contains("could not be loaded"));
}

#[test]
fn test_huge_lookback_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    matrixwatch()
        .current_dir(dir.path())
        .args(["--lookback-hours", "4294967295", "window"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("invalid reporting window"))
        .stderr(predicates::str::contains("panicked").not());
}
