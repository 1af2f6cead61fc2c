//! Configuration system for longtask
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (LONGTASK_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::computation::SimulationArgs;
use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LongtaskConfig {
    /// Worker process settings
    pub runner: RunnerConfig,

    /// Defaults for `longtask run`
    pub simulation: SimulationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// File the configuration was loaded from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Worker process settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Worker program (default: this binary)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_program: Option<PathBuf>,

    /// Message of the cancellation error (default: the computation's own)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_message: Option<String>,

    /// Interval between progress polls in milliseconds
    pub poll_interval_ms: u64,
}

/// Simulation defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulated duration in seconds
    pub duration_secs: f64,

    /// Initial value
    pub input1: f64,

    /// Drive power
    pub input2: f64,

    /// Wall-clock delay per step in milliseconds
    pub step_delay_ms: u64,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// Default implementations

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            worker_program: None,
            stop_message: None,
            poll_interval_ms: 100,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration_secs: 2.0,
            input1: 1.0,
            input2: 2.0,
            step_delay_ms: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

impl SimulationConfig {
    /// Arguments for one simulation run
    pub fn to_args(&self) -> SimulationArgs {
        SimulationArgs::new(self.duration_secs, self.input1, self.input2)
            .with_step_delay_ms(self.step_delay_ms)
    }
}

impl LongtaskConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        if let Some(path) = Self::find_config_file(config_path)? {
            config = Self::from_file(&path)?;
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides();

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Parse one configuration file, without overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading configuration file");
        let content = fs::read_to_string(path).map_err(|source| Error::IoRead {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", path.display(), e.message()),
            source: Some(e),
        })?;
        config.source = Some(path.to_path_buf());

        info!(path = %path.display(), "Configuration loaded from file");
        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::config_not_found(path));
        }

        for path in search_paths() {
            if path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a `LONGTASK_*` lookup
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Runner settings
        if let Some(val) = lookup("LONGTASK_WORKER_PROGRAM") {
            self.runner.worker_program = Some(PathBuf::from(val));
        }
        if let Some(val) = lookup("LONGTASK_STOP_MESSAGE") {
            self.runner.stop_message = Some(val);
        }
        if let Some(n) = lookup("LONGTASK_POLL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.runner.poll_interval_ms = n;
        }

        // Simulation settings
        if let Some(n) = lookup("LONGTASK_DURATION").and_then(|v| v.parse().ok()) {
            self.simulation.duration_secs = n;
        }
        if let Some(n) = lookup("LONGTASK_INPUT1").and_then(|v| v.parse().ok()) {
            self.simulation.input1 = n;
        }
        if let Some(n) = lookup("LONGTASK_INPUT2").and_then(|v| v.parse().ok()) {
            self.simulation.input2 = n;
        }
        if let Some(n) = lookup("LONGTASK_STEP_DELAY_MS").and_then(|v| v.parse().ok()) {
            self.simulation.step_delay_ms = n;
        }

        // Logging settings
        if let Some(val) = lookup("LONGTASK_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = lookup("LONGTASK_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Some(val) = lookup("LONGTASK_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        if let Some(ref program) = self.runner.worker_program {
            self.runner.worker_program = Some(PathBuf::from(expand_path(&program.to_string_lossy())));
        }

        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(ref program) = self.runner.worker_program {
            if program.as_os_str().is_empty() {
                return Err(Error::config_field_invalid(
                    "runner.worker_program",
                    "worker_program cannot be empty",
                ));
            }
        }
        if self.runner.poll_interval_ms == 0 {
            return Err(Error::config_field_invalid(
                "runner.poll_interval_ms",
                "poll_interval_ms must be greater than 0",
            ));
        }

        let sim = &self.simulation;
        if !sim.duration_secs.is_finite() || sim.duration_secs <= 0.0 {
            return Err(Error::config_field_invalid(
                "simulation.duration_secs",
                format!("duration_secs must be a positive number, got {}", sim.duration_secs),
            ));
        }
        if !sim.input1.is_finite() || !sim.input2.is_finite() {
            return Err(Error::config_field_invalid(
                "simulation.input1",
                "input1 and input2 must be finite numbers",
            ));
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }
        if self.logging.max_files == 0 {
            return Err(Error::config_field_invalid(
                "logging.max_files",
                "max_files must be at least 1",
            ));
        }

        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Standard configuration locations, in search order
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("longtask.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("longtask").join("config.toml"));
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".longtask").join("config.toml"));
    }
    paths
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file, returning where it was written
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".longtask")
                .join("config.toml")
        });

    // Check if file exists
    if config_path.exists() && !force {
        return Err(Error::IoWrite {
            path: config_path,
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "file already exists, use --force to overwrite",
            ),
        });
    }

    // Create parent directories
    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| Error::IoWrite {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(&config_path, generate_default_config()).map_err(|source| Error::IoWrite {
        path: config_path.clone(),
        source,
    })?;

    info!(path = %config_path.display(), "Configuration file created");
    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# longtask configuration

[runner]
# Worker program to launch (default: this binary in worker mode)
# worker_program = "/usr/local/bin/longtask"

# Message of the error reported by a stopped run
# (default: "Simulation was stopped." for the simulation)
# stop_message = "Run was stopped."

# Interval between progress polls in milliseconds
poll_interval_ms = 100

[simulation]
# Simulated duration in seconds (10 steps per second)
duration_secs = 2.0

# Initial value
input1 = 1.0

# Drive power
input2 = 2.0

# Wall-clock delay per step in milliseconds
step_delay_ms = 10

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.longtask/logs/longtask.log"

# Maximum log file size in MB before rotation
max_file_size_mb = 100

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = LongtaskConfig::default();
        assert_eq!(config.runner.poll_interval_ms, 100);
        assert!(config.runner.worker_program.is_none());
        assert_eq!(config.simulation.duration_secs, 2.0);
        assert_eq!(config.simulation.step_delay_ms, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("LONGTASK_POLL_INTERVAL_MS", "250"),
            ("LONGTASK_DURATION", "0.5"),
            ("LONGTASK_INPUT2", "4"),
            ("LONGTASK_STOP_MESSAGE", "halted"),
            ("LONGTASK_LOG_LEVEL", "debug"),
            ("LONGTASK_LOG_JSON", "1"),
        ]
        .into_iter()
        .collect();

        let mut config = LongtaskConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.runner.poll_interval_ms, 250);
        assert_eq!(config.runner.stop_message.as_deref(), Some("halted"));
        assert_eq!(config.simulation.duration_secs, 0.5);
        assert_eq!(config.simulation.input2, 4.0);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_unparsable_override_is_ignored() {
        let mut config = LongtaskConfig::default();
        config.apply_overrides(|key| (key == "LONGTASK_POLL_INTERVAL_MS").then(|| "soon".to_string()));
        assert_eq!(config.runner.poll_interval_ms, 100);
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(LongtaskConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_zero_poll_interval() {
        let mut config = LongtaskConfig::default();
        config.runner.poll_interval_ms = 0;
        match config.validate().unwrap_err() {
            Error::ConfigValidation { field, .. } => {
                assert_eq!(field.as_deref(), Some("runner.poll_interval_ms"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_validation_bad_duration() {
        let mut config = LongtaskConfig::default();
        config.simulation.duration_secs = -1.0;
        assert!(config.validate().is_err());

        config.simulation.duration_secs = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = LongtaskConfig::default();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_path_expansion() {
        let mut config = LongtaskConfig::default();
        config.runner.worker_program = Some(PathBuf::from("~/bin/longtask"));
        config.logging.file = Some("~/logs/longtask.log".to_string());
        config.expand_paths();

        // Should not contain ~
        assert!(!config.runner.worker_program.unwrap().to_string_lossy().contains('~'));
        assert!(!config.logging.file.unwrap().contains('~'));
    }

    #[test]
    fn test_generated_config_matches_defaults() {
        let parsed: LongtaskConfig = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(parsed, LongtaskConfig::default());
    }

    #[test]
    fn test_serialize_deserialize() {
        let mut config = LongtaskConfig::default();
        config.runner.stop_message = Some("halted".to_string());

        let parsed: LongtaskConfig = toml::from_str(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_parse_partial_config() {
        let config: LongtaskConfig = toml::from_str(
            r#"
[runner]
poll_interval_ms = 20

[simulation]
duration_secs = 0.5
"#,
        )
        .unwrap();

        assert_eq!(config.runner.poll_interval_ms, 20);
        assert_eq!(config.simulation.duration_secs, 0.5);
        assert_eq!(config.simulation.input2, 2.0);
        assert_eq!(config.logging.max_files, 5);
    }

    #[test]
    fn test_simulation_args() {
        let args = SimulationConfig::default().to_args();
        assert_eq!(args, SimulationArgs::new(2.0, 1.0, 2.0));
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let path_str = path.to_str().unwrap();

        assert_eq!(init_config(Some(path_str), false).unwrap(), path);
        assert!(init_config(Some(path_str), false).is_err());
        assert!(init_config(Some(path_str), true).is_ok());

        let loaded = LongtaskConfig::from_file(&path).unwrap();
        assert_eq!(loaded.source.as_deref(), Some(path.as_path()));
        assert_eq!(loaded.runner, RunnerConfig::default());
    }

    #[test]
    fn test_explicit_missing_file() {
        let err = LongtaskConfig::load(Some("/nonexistent/longtask.toml")).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::ConfigNotFound);
    }
}
