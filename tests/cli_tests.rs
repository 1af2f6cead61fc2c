//! CLI integration tests
//!
//! Tests the command-line interface using assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command for the longtask binary, isolated from any user configuration
fn longtask_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("longtask").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("LONGTASK_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

// ─────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    longtask_cmd(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("worker").not());
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    longtask_cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_invalid_command() {
    let home = TempDir::new().unwrap();
    longtask_cmd(&home)
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

// ─────────────────────────────────────────────────────────────────
// Config Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_default() {
    let home = TempDir::new().unwrap();
    longtask_cmd(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("showing defaults"))
        .stdout(predicate::str::contains("[runner]"))
        .stdout(predicate::str::contains("[simulation]"))
        .stdout(predicate::str::contains("[logging]"));
}

#[test]
fn test_config_validate_default() {
    // Default config should always be valid
    let home = TempDir::new().unwrap();
    longtask_cmd(&home)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_config_validate_missing_file() {
    let home = TempDir::new().unwrap();
    longtask_cmd(&home)
        .args(["config", "validate", "--config", "/nonexistent/longtask.toml"])
        .assert()
        .code(10)
        .stderr(predicate::str::contains("E100"))
        .stderr(predicate::str::contains("config init"));
}

#[test]
fn test_config_init_then_refuse_overwrite() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("longtask.toml");

    longtask_cmd(&home)
        .args(["config", "init", "--path"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file created"));
    assert!(path.exists());

    longtask_cmd(&home)
        .args(["config", "init", "--path"])
        .arg(&path)
        .assert()
        .code(20)
        .stderr(predicate::str::contains("--force"));

    // Picked up from the working directory
    longtask_cmd(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded from longtask.toml"));
}

// ─────────────────────────────────────────────────────────────────
// Run Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_run_short_simulation() {
    let home = TempDir::new().unwrap();
    longtask_cmd(&home)
        .args(["run", "--duration", "0.5", "--step-delay-ms", "1", "--poll-interval-ms", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Progress: "))
        .stdout(predicate::str::contains("Simulation complete!"))
        .stdout(predicate::str::contains("Steps: 5"));
}

#[test]
fn test_run_json_output() {
    let home = TempDir::new().unwrap();
    let output = longtask_cmd(&home)
        .args(["run", "--duration", "0.3", "--step-delay-ms", "0", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["message"], "Simulation complete!");
    assert_eq!(report["values"].as_array().unwrap().len(), 3);
    assert_eq!(report["time"].as_array().unwrap().len(), 3);
}

#[test]
fn test_run_stop_at_exits_cancelled() {
    let home = TempDir::new().unwrap();
    longtask_cmd(&home)
        .args(["run", "--duration", "60", "--stop-at", "0", "--poll-interval-ms", "10"])
        .assert()
        .code(51)
        .stderr(predicate::str::contains("E502"))
        .stderr(predicate::str::contains("Simulation was stopped."));
}

#[test]
fn test_run_stop_message_from_env() {
    let home = TempDir::new().unwrap();
    longtask_cmd(&home)
        .env("LONGTASK_STOP_MESSAGE", "Halted by operator.")
        .args(["run", "--duration", "60", "--stop-at", "0", "--quiet"])
        .assert()
        .code(51)
        .stderr(predicate::str::contains("Halted by operator."));
}

#[test]
fn test_run_divergence_fails() {
    let home = TempDir::new().unwrap();
    longtask_cmd(&home)
        .args(["run", "--input1", "1e308", "--input2", "1e308", "--step-delay-ms", "0", "--quiet"])
        .assert()
        .code(50)
        .stderr(predicate::str::contains("E500"))
        .stderr(predicate::str::contains("simulation diverged at step"));
}

#[test]
fn test_run_rejects_bad_duration() {
    let home = TempDir::new().unwrap();
    longtask_cmd(&home)
        .args(["run", "--duration", "-1"])
        .assert()
        .code(10)
        .stderr(predicate::str::contains("duration_secs"));
}

#[test]
fn test_run_with_missing_worker_program() {
    let home = TempDir::new().unwrap();
    longtask_cmd(&home)
        .env("LONGTASK_WORKER_PROGRAM", "/nonexistent/longtask-worker")
        .args(["run", "--quiet"])
        .assert()
        .code(30)
        .stderr(predicate::str::contains("E300"));
}

// ─────────────────────────────────────────────────────────────────
// Worker Mode Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_worker_serves_one_request() {
    let home = TempDir::new().unwrap();
    let request = longtask::protocol::RunRequest::new(
        "simulation",
        serde_json::json!({"duration": 0.2, "input1": 1.0, "input2": 2.0, "step_delay_ms": 0}),
    );

    longtask_cmd(&home)
        .arg("worker")
        .write_stdin(request.to_line().unwrap())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""type":"PROGRESS""#))
        .stdout(predicate::str::contains(r#""type":"COMPLETED""#))
        .stdout(predicate::str::ends_with("{\"type\":\"PROGRESS\",\"value\":1.0}\n"));
}

#[test]
fn test_worker_rejects_garbage() {
    let home = TempDir::new().unwrap();
    longtask_cmd(&home)
        .arg("worker")
        .write_stdin("hello\n")
        .assert()
        .code(40)
        .stdout(predicate::str::contains(r#""type":"FAILED""#));
}
