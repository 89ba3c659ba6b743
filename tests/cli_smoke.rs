mod support;

use std::fs;

use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;

use support::TestProject;

#[test]
fn teamlog_help_works() {
    Command::cargo_bin("teamlog")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("shared-folder time tracking"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = [
        "init", "start", "end", "focus", "comment", "list", "show", "stats", "developer",
    ];

    for cmd in subcommands {
        Command::cargo_bin("teamlog")
            .expect("binary")
            .arg(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn init_creates_config_storage_and_readme() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    Command::cargo_bin("teamlog")?
        .current_dir(dir.path())
        .env_remove("TEAMLOG_PROJECT")
        .args(["init", "Apollo", "--max-hours", "6", "--start", "2025-01-06"])
        .assert()
        .success()
        .stdout(contains("initialized Apollo"));

    let config = fs::read_to_string(dir.path().join(".teamlog.toml"))?;
    assert!(config.contains("name = \"Apollo\""));
    assert!(config.contains("max_hours_per_day = 6"));
    assert!(dir.path().join("timework").join("README.txt").exists());

    Command::cargo_bin("teamlog")?
        .current_dir(dir.path())
        .env_remove("TEAMLOG_PROJECT")
        .args(["init", "Other"])
        .assert()
        .success()
        .stdout(contains("nothing to do"));
    Ok(())
}

#[test]
fn commands_outside_a_project_fail_with_user_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    Command::cargo_bin("teamlog")?
        .current_dir(dir.path())
        .env_remove("TEAMLOG_PROJECT")
        .args(["list"])
        .assert()
        .code(2)
        .stderr(contains("teamlog init"));
    Ok(())
}

#[test]
fn mutating_without_developer_fails() -> Result<(), Box<dyn std::error::Error>> {
    let project = TestProject::init()?;
    project
        .cmd()
        .args(["start", "Foo"])
        .assert()
        .code(2)
        .stderr(contains("teamlog developer set"));
    Ok(())
}

#[test]
fn developer_set_then_start_uses_profile() -> Result<(), Box<dyn std::error::Error>> {
    let project = TestProject::init()?;
    project
        .cmd()
        .args(["developer", "set", "Mary Ann", "--hours-per-day", "6"])
        .assert()
        .success()
        .stdout(contains("running.mary_ann.json"));

    project
        .cmd()
        .args(["developer", "show"])
        .assert()
        .success()
        .stdout(contains("Mary Ann"));

    project.cmd().args(["start", "Foo"]).assert().success();
    assert!(project.storage().join("running.mary_ann.json").exists());
    Ok(())
}

#[test]
fn two_developers_share_a_task() -> Result<(), Box<dyn std::error::Error>> {
    let project = TestProject::init()?;

    project
        .cmd()
        .args(["--developer", "alice", "start", "Foo", "-d", "shared work"])
        .assert()
        .success()
        .stdout(contains("Task started"));
    project
        .cmd()
        .args(["--developer", "bob", "start", "foo"])
        .assert()
        .success()
        .stdout(contains("Joined task"));
    project
        .cmd()
        .args(["--developer", "bob", "start", "FOO"])
        .assert()
        .success()
        .stdout(contains("already works on"));

    project
        .cmd()
        .args(["--developer", "alice", "focus", "foo", "--minutes", "90"])
        .assert()
        .success();
    project
        .cmd()
        .args(["--developer", "bob", "comment", "foo", "halfway there"])
        .assert()
        .success();

    let output = project.cmd().args(["--json", "show", "foo"]).output()?;
    assert!(output.status.success());
    let payload: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(payload["schema_version"], "teamlog.v1");
    assert_eq!(payload["command"], "show");
    assert_eq!(payload["data"]["state"], "running");
    let task = &payload["data"]["task"];
    assert_eq!(task["developerWorkTimes"]["alice"], 90);
    assert_eq!(task["comments"][0]["comment"], "halfway there");
    assert_eq!(task["description"], "shared work");

    project
        .cmd()
        .args(["--developer", "alice", "end", "foo"])
        .assert()
        .success()
        .stdout(contains("Task ended"));

    let output = project.cmd().args(["--json", "list", "--finished"]).output()?;
    let payload: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(payload["data"]["total"], 1);
    assert_eq!(payload["data"]["tasks"][0]["task"]["finishedBy"], "alice");

    project
        .cmd()
        .args(["stats"])
        .assert()
        .success()
        .stdout(contains("Focus time: 1 hours"));
    Ok(())
}

#[test]
fn unknown_task_reports_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let project = TestProject::init()?;
    project
        .cmd()
        .args(["--developer", "alice", "end", "ghost"])
        .assert()
        .code(2)
        .stderr(contains("Task not found: ghost"));

    let output = project
        .cmd()
        .args(["--json", "--developer", "alice", "focus", "ghost", "-m", "5"])
        .output()?;
    assert_eq!(output.status.code(), Some(2));
    let payload: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["command"], "focus");
    assert_eq!(payload["error"]["kind"], "user_error");
    assert_eq!(payload["error"]["hint"], "teamlog list");
    assert_eq!(payload["error"]["details"]["task"], "ghost");
    assert!(payload.get("data").is_none());
    Ok(())
}

#[test]
fn blank_comment_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let project = TestProject::init()?;
    project
        .cmd()
        .args(["--developer", "alice", "start", "Foo"])
        .assert()
        .success();
    project
        .cmd()
        .args(["--developer", "alice", "comment", "foo", "   "])
        .assert()
        .code(2)
        .stderr(contains("comment cannot be empty"));
    Ok(())
}
