//! CLI smoke tests
//!
//! Exercises the binary end to end for the paths that must not touch the
//! network: version output, catalog listing, and the fail-fast
//! configuration errors that have to fire before any workspace directory
//! is created.

use assert_cmd::Command;
use predicates::prelude::*;

fn radar_love() -> Command {
    let mut cmd = Command::cargo_bin("radar_love").unwrap();
    // Isolate from any credential present in the test environment.
    cmd.env_remove("RADAR_LOVE_TOKEN").env_remove("GITHUB_TOKEN");
    cmd
}

/// Config file pointing the workspace root into the given temp dir.
fn write_config(dir: &std::path::Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let workspace_root = dir.join("workspaces");
    let config_path = dir.join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            "repo = \"acme/widgets\"\nworkspace_root = \"{}\"\n",
            workspace_root.display()
        ),
    )
    .unwrap();
    (config_path, workspace_root)
}

#[test]
fn version_prints_name_and_version() {
    radar_love()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("radar_love"));
}

#[test]
fn scenarios_lists_the_catalog() {
    radar_love()
        .arg("scenarios")
        .assert()
        .success()
        .stdout(predicate::str::contains("cloud-credential-basic"))
        .stdout(predicate::str::contains("private-key-deploy"));
}

#[test]
fn scenarios_json_is_parseable() {
    let output = radar_love().args(["scenarios", "--json"]).output().unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<&str> = parsed
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"generic-token-script"));
}

#[test]
fn missing_credential_is_config_error_before_any_workspace_exists() {
    let tmp = tempfile::tempdir().unwrap();
    let (config_path, workspace_root) = write_config(tmp.path());

    radar_love()
        .args(["run", "--scenario", "cloud-credential-basic"])
        .arg("--config")
        .arg(&config_path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("credential"));

    // Fail-fast: the configuration error fired before any workspace
    // directory was created.
    assert!(!workspace_root.exists());
}

#[test]
fn unknown_scenario_is_config_error_before_any_workspace_exists() {
    let tmp = tempfile::tempdir().unwrap();
    let (config_path, workspace_root) = write_config(tmp.path());

    radar_love()
        .args(["run", "--scenario", "no-such-scenario"])
        .arg("--config")
        .arg(&config_path)
        .env("RADAR_LOVE_TOKEN", "dummy-token-for-test")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no-such-scenario"));

    assert!(!workspace_root.exists());
}

#[test]
fn missing_repo_is_config_error() {
    let tmp = tempfile::tempdir().unwrap();
    let config_path = tmp.path().join("config.toml");
    std::fs::write(&config_path, "").unwrap();

    radar_love()
        .args(["run", "--scenario", "cloud-credential-basic"])
        .arg("--config")
        .arg(&config_path)
        .env("RADAR_LOVE_TOKEN", "dummy-token-for-test")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("repo"));
}

#[test]
fn run_requires_a_scenario_flag() {
    radar_love().arg("run").assert().failure();
}

#[test]
fn invalid_repo_slug_is_config_error() {
    radar_love()
        .args(["run", "--scenario", "cloud-credential-basic"])
        .args(["--repo", "not-a-slug"])
        .env("RADAR_LOVE_TOKEN", "dummy-token-for-test")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not-a-slug"));
}
