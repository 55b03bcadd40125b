//! End-to-end checks of the `trsync` binary that need no TestRail server.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn trsync() -> Command {
    let mut cmd = cargo_bin_cmd!("trsync");
    cmd.env_remove("TRSYNC_CONFIG")
        .env_remove("TRSYNC_ARTIFACT_TYPE")
        .env_remove("TRSYNC_FLAGS")
        .env_remove("TRSYNC_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn config_file(section: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"TestRailConnection": {section}}}"#).unwrap();
    file
}

#[test]
fn help_lists_commands() {
    trsync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("find-new"))
        .stdout(predicate::str::contains("find-updates"));
}

#[test]
fn version_as_json() {
    trsync()
        .args(["version", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""connector":"TestRail""#));
}

#[test]
fn completions_for_bash() {
    trsync()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trsync"));
}

#[test]
fn missing_config_file_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    trsync()
        .arg("connect")
        .arg("--config")
        .arg(dir.path().join("absent.json"))
        .assert()
        .code(7)
        .stderr(predicate::str::contains("CONFIG_ERROR"));
}

#[test]
fn missing_required_key_is_a_config_error() {
    let file = config_file(
        r#"{"Url": "acme.testrail.io", "User": "qa@acme.io", "Password": "x", "Project": "Payments"}"#,
    );
    trsync()
        .arg("connect")
        .arg("--config")
        .arg(file.path())
        .assert()
        .code(7)
        .stderr(predicate::str::contains("ExternalIDField"));
}

#[test]
fn unknown_configured_kind_is_rejected() {
    let file = config_file(
        r#"{"Url": "acme.testrail.io", "User": "qa@acme.io", "Password": "x", "Project": "Payments",
            "ExternalIDField": "RallyObjectID", "ArtifactType": "milestone"}"#,
    );
    trsync()
        .arg("find-new")
        .arg("--config")
        .arg(file.path())
        .assert()
        .code(5)
        .stderr(predicate::str::contains("UNKNOWN_KIND"));
}

#[test]
fn bad_since_fails_before_connecting() {
    trsync()
        .args(["find-updates", "--since", "last week"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("--since"));
}

#[test]
fn unknown_kind_flag_is_a_usage_error() {
    trsync()
        .args(["find", "12", "--kind", "milestone"])
        .assert()
        .code(2);
}
