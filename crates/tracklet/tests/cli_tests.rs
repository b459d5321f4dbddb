//! Integration tests for the tracklet CLI: output modes and exit codes

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn tracklet(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tracklet").unwrap();
    cmd.current_dir(temp.path())
        .env_remove("TRACKLET_DATA_DIR")
        .env_remove("TRACKLET_USER")
        .env_remove("RUST_LOG");
    cmd
}

/// Helper to create a test environment with tracklet initialized
fn setup_test_env() -> TempDir {
    let temp = TempDir::new().unwrap();
    tracklet(&temp).arg("init").assert().success();
    temp
}

fn create_json(temp: &TempDir, title: &str, description: &str) -> Value {
    let output = tracklet(temp)
        .args(["create", "--title", title, "--description", description, "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_init_creates_data_directory() {
    let temp = TempDir::new().unwrap();
    tracklet(&temp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized tracklet"));
    assert!(temp.path().join(".tracklet/data/index.json").exists());
}

#[test]
fn test_commands_require_init() {
    let temp = TempDir::new().unwrap();
    tracklet(&temp)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("tracklet init"));
}

#[test]
fn test_data_dir_from_environment() {
    let temp = TempDir::new().unwrap();
    tracklet(&temp)
        .env("TRACKLET_DATA_DIR", "custom")
        .arg("init")
        .assert()
        .success();
    assert!(temp.path().join("custom/data/index.json").exists());
}

#[test]
fn test_create_and_show() {
    let temp = setup_test_env();
    let created = create_json(
        &temp,
        "Export to CSV fails",
        "The export button returns a 500 error",
    );
    assert_eq!(created["success"], true);
    assert_eq!(created["data"]["status"], "Open");
    assert_eq!(created["data"]["createdBy"], "anonymous");
    let id = created["data"]["id"].as_str().unwrap().to_string();

    tracklet(&temp)
        .args(["show", &id[..8]])
        .assert()
        .success()
        .stdout(predicate::str::contains("Title: Export to CSV fails"))
        .stdout(predicate::str::contains("Assigned To: Unassigned"));
}

#[test]
fn test_user_flag_and_env_set_creator() {
    let temp = setup_test_env();
    let output = tracklet(&temp)
        .args([
            "create",
            "--title",
            "Profile picture upload",
            "--description",
            "Uploading a PNG never finishes",
            "--user",
            "dana@example.com",
            "--json",
        ])
        .output()
        .unwrap();
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["data"]["createdBy"], "dana@example.com");

    let output = tracklet(&temp)
        .env("TRACKLET_USER", "sam@example.com")
        .args([
            "create",
            "--title",
            "Notifications delayed",
            "--description",
            "Push notifications arrive an hour late",
            "--json",
        ])
        .output()
        .unwrap();
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["data"]["createdBy"], "sam@example.com");
}

#[test]
fn test_exit_code_validation_failed() {
    let temp = setup_test_env();
    tracklet(&temp)
        .args(["create", "--title", "Hi", "--description", "too short"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Title must be at least 5 characters"))
        .stderr(predicate::str::contains(
            "Description must be at least 10 characters",
        ));
}

#[test]
fn test_duplicates_need_force() {
    let temp = setup_test_env();
    create_json(
        &temp,
        "Safari login button does not work",
        "Nothing happens on click in Safari 17",
    );

    let args = [
        "create",
        "--title",
        "Login button broken on Safari",
        "--description",
        "The login button is unresponsive",
    ];
    tracklet(&temp)
        .args(args)
        .assert()
        .code(6)
        .stderr(predicate::str::contains("Similar issues already exist"))
        .stderr(predicate::str::contains("Safari login button does not work"));

    tracklet(&temp).args(args).arg("--force").assert().success();

    let output = tracklet(&temp).args(["list", "--json"]).output().unwrap();
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["data"]["count"], 2);
}

#[test]
fn test_duplicate_error_as_json() {
    let temp = setup_test_env();
    create_json(&temp, "Dark mode toggle missing", "Settings page has no toggle");

    let output = tracklet(&temp)
        .args([
            "create",
            "--title",
            "Dark mode toggle gone",
            "--description",
            "The toggle disappeared",
            "--json",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["success"], false);
    assert_eq!(value["error"]["code"], "DUPLICATES_FOUND");
    assert_eq!(
        value["error"]["details"]["matches"][0]["title"],
        "Dark mode toggle missing"
    );
}

#[test]
fn test_status_workflow_exit_codes() {
    let temp = setup_test_env();
    let created = create_json(&temp, "Search results empty", "Searching for anything returns nothing");
    let id = created["data"]["id"].as_str().unwrap().to_string();

    tracklet(&temp)
        .args(["status", &id, "done"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("In Progress first"));

    tracklet(&temp)
        .args(["status", &id, "in_progress"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is now In Progress"));

    tracklet(&temp).args(["status", &id, "done"]).assert().success();

    let output = tracklet(&temp)
        .args(["list", "--status", "done", "--json"])
        .output()
        .unwrap();
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["data"]["issues"][0]["status"], "Done");
}

#[test]
fn test_exit_code_not_found() {
    let temp = setup_test_env();
    tracklet(&temp)
        .args(["show", "deadbeef"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_exit_code_invalid_argument() {
    let temp = setup_test_env();
    tracklet(&temp)
        .args(["status", "deadbeef", "closed"])
        .assert()
        .code(2);
}

#[test]
fn test_usage_errors_and_help() {
    let temp = TempDir::new().unwrap();
    tracklet(&temp)
        .arg("frobnicate")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("frobnicate"));

    tracklet(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_quiet_create_prints_only_id() {
    let temp = setup_test_env();
    let output = tracklet(&temp)
        .args([
            "--quiet",
            "create",
            "--title",
            "Timezone shown wrong",
            "--description",
            "Dates use UTC instead of local time",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let id = stdout.trim();
    assert_eq!(id.len(), 36);
    assert!(temp
        .path()
        .join(format!(".tracklet/data/issues/{}.json", id))
        .exists());
}

#[test]
fn test_similar_command() {
    let temp = setup_test_env();
    create_json(&temp, "Checkout total wrong", "Discount codes are ignored");

    tracklet(&temp)
        .args(["similar", "Wrong checkout total shown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Checkout total wrong"));

    tracklet(&temp)
        .args(["similar", "Avatar upload stalls"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No similar issues"));
}

#[test]
fn test_config_file_changes_limits() {
    let temp = setup_test_env();
    fs::write(
        temp.path().join(".tracklet/config.toml"),
        "[intake]\ntitle_max_len = 10\n",
    )
    .unwrap();

    tracklet(&temp)
        .args([
            "create",
            "--title",
            "This title is too long now",
            "--description",
            "Limits come from config.toml",
        ])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Title must be at most 10 characters"));
}

#[test]
fn test_malformed_config_is_an_error() {
    let temp = setup_test_env();
    fs::write(temp.path().join(".tracklet/config.toml"), "[intake\n").unwrap();

    tracklet(&temp)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config.toml"));
}
