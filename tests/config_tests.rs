//! Configuration system tests
//!
//! Tests configuration loading, validation, and environment overrides

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use longtask::config::LongtaskConfig;

/// Test fixture for configuration testing
struct ConfigFixture {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl ConfigFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        Self { temp_dir, config_path }
    }

    fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).unwrap();
    }

    fn path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("longtask").unwrap();
        cmd.current_dir(self.temp_dir.path())
            .env("HOME", self.temp_dir.path())
            .env_remove("LONGTASK_POLL_INTERVAL_MS")
            .env_remove("LONGTASK_DURATION")
            .env_remove("LONGTASK_LOG_LEVEL");
        cmd
    }
}

// ─────────────────────────────────────────────────────────────────
// Valid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_minimal_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[runner]\n\n[simulation]\n\n[logging]\n");

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .success();
}

#[test]
fn test_full_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[runner]
worker_program = "/usr/local/bin/longtask"
stop_message = "Run was stopped."
poll_interval_ms = 50

[simulation]
duration_secs = 5.0
input1 = 0.5
input2 = 3.0
step_delay_ms = 2

[logging]
level = "debug"
file = "/tmp/longtask.log"
max_file_size_mb = 50
max_files = 3
json_format = false
"#,
    );

    let config = LongtaskConfig::from_file(&fixture.config_path).unwrap();
    assert_eq!(config.runner.worker_program, Some(PathBuf::from("/usr/local/bin/longtask")));
    assert_eq!(config.runner.stop_message.as_deref(), Some("Run was stopped."));
    assert_eq!(config.simulation.to_args().total_steps(), 50);
    assert!(config.validate().is_ok());

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .success();
}

// ─────────────────────────────────────────────────────────────────
// Invalid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_zero_poll_interval() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[runner]\npoll_interval_ms = 0\n");

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .code(10)
        .stderr(predicate::str::contains("E102"))
        .stderr(predicate::str::contains("poll_interval_ms"));
}

#[test]
fn test_negative_duration() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[simulation]\nduration_secs = -2.0\n");

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure();
}

#[test]
fn test_invalid_log_level() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[logging]\nlevel = \"invalid_level\"\n");

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure();
}

#[test]
fn test_malformed_toml() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[runner\npoll_interval_ms = 10\n");

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .code(10)
        .stderr(predicate::str::contains("E101"));
}

#[test]
fn test_wrong_value_type() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[simulation]\nduration_secs = \"long\"\n");

    let err = LongtaskConfig::from_file(&fixture.config_path).unwrap_err();
    assert_eq!(err.code(), longtask::error::ErrorCode::ConfigParseError);
}

// ─────────────────────────────────────────────────────────────────
// Config Show Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_custom() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[runner]
stop_message = "Custom stop."
poll_interval_ms = 321

[simulation]
input2 = 7.5
"#,
    );

    fixture
        .cmd()
        .args(["config", "show", "--config", fixture.path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Custom stop."))
        .stdout(predicate::str::contains("321"))
        .stdout(predicate::str::contains("7.5"));
}

// ─────────────────────────────────────────────────────────────────
// Config Init Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_init_creates_valid_file() {
    let fixture = ConfigFixture::new();
    let config_path = fixture.temp_dir.path().join("nested").join("new_config.toml");

    fixture
        .cmd()
        .args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file created"));

    assert!(config_path.exists());

    fixture
        .cmd()
        .args(["config", "validate", "--config"])
        .arg(&config_path)
        .assert()
        .success();
}

#[test]
fn test_config_init_force_overwrite() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[runner]\nstop_message = \"old\"\n");

    fixture
        .cmd()
        .args(["config", "init", "--path", fixture.path(), "--force"])
        .assert()
        .success();

    // Verify file was overwritten
    let content = fs::read_to_string(fixture.path()).unwrap();
    assert!(!content.contains("\"old\""));
}

// ─────────────────────────────────────────────────────────────────
// Environment Variable Override Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_env_overrides_file() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[runner]\npoll_interval_ms = 10\n");

    fixture
        .cmd()
        .args(["config", "show", "--config", fixture.path()])
        .env("LONGTASK_POLL_INTERVAL_MS", "777")
        .assert()
        .success()
        .stdout(predicate::str::contains("poll_interval_ms = 777"));
}

#[test]
fn test_invalid_env_value_fails_validation() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[runner]\n");

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .env("LONGTASK_DURATION", "0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("duration_secs"));
}
