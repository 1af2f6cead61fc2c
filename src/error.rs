//! Error types for longtask
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Errors reported by the worker process, rebuilt on the controller side
//! - Exit codes for CLI

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for longtask operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Worker process errors (3xx)
    WorkerSpawn = 300,
    WorkerExited = 301,

    // Protocol errors (4xx)
    ProtocolVersion = 400,
    ProtocolMalformed = 401,

    // Execution errors (5xx)
    ExecutionFailed = 500,
    ExecutionCancelled = 502,
    ComputationNotFound = 503,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            300..=399 => 30, // Worker process errors
            400..=499 => 40, // Protocol errors
            502 => 51,       // Cancelled runs are distinguishable from failures
            500..=599 => 50, // Execution errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────
// Errors produced by a run
// ─────────────────────────────────────────────────────────────────

/// A failure raised inside the worker process, carried across the
/// process boundary as text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteError {
    /// One-line description of the failure
    pub message: String,

    /// Full diagnostic text: cause chain, backtrace or panic location
    pub trace: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>, trace: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: trace.into(),
        }
    }

    /// Capture an `anyhow` error with its whole cause chain
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        Self {
            message: format!("{:#}", err),
            trace: format!("{:?}", err),
        }
    }
}

/// Outcome error of a single run, cached by the task and handed out
/// on every read
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The run was forcefully stopped
    #[error("{message}")]
    Cancelled { message: String },

    /// The computation failed inside the worker process
    #[error("Computation failed in worker process:\n{}", .0.trace)]
    Computation(#[source] RemoteError),

    /// The worker died without reporting an outcome
    #[error("Worker process exited without reporting an outcome ({status})")]
    WorkerExited { status: String },

    /// The worker reported a value that does not decode into the output type
    #[error("Malformed outcome from worker: {0}")]
    MalformedOutcome(String),
}

impl TaskError {
    /// Whether this error is the cancellation marker set by `stop`
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled { .. })
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file {path}: {source}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file {path}: {source}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Worker Process Errors
    // ─────────────────────────────────────────────────────────────

    /// The worker process could not be started
    #[error("Failed to spawn worker process {program}: {source}")]
    WorkerSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────
    // Protocol Errors
    // ─────────────────────────────────────────────────────────────

    /// Protocol version mismatch
    #[error("Protocol version mismatch: worker speaks {worker}, request uses {request}")]
    ProtocolVersion { worker: String, request: String },

    /// Malformed message
    #[error("Malformed protocol message: {message}")]
    ProtocolMalformed { message: String },

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────

    /// Outcome of a run: cancellation, computation failure, dead worker
    #[error(transparent)]
    Task(#[from] TaskError),

    /// No computation registered under this name
    #[error("Unknown computation: {name}")]
    ComputationNotFound { name: String },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,

            Error::WorkerSpawn { .. } => ErrorCode::WorkerSpawn,

            Error::ProtocolVersion { .. } => ErrorCode::ProtocolVersion,
            Error::ProtocolMalformed { .. } => ErrorCode::ProtocolMalformed,
            Error::Json(_) => ErrorCode::ProtocolMalformed,

            Error::Task(TaskError::Cancelled { .. }) => ErrorCode::ExecutionCancelled,
            Error::Task(TaskError::Computation(_)) => ErrorCode::ExecutionFailed,
            Error::Task(TaskError::WorkerExited { .. }) => ErrorCode::WorkerExited,
            Error::Task(TaskError::MalformedOutcome(_)) => ErrorCode::ProtocolMalformed,
            Error::ComputationNotFound { .. } => ErrorCode::ComputationNotFound,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Check if the error is the cancellation of a run
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Task(e) if e.is_cancelled())
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'longtask config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'longtask config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values."
            ),

            Error::WorkerSpawn { .. } => Some(
                "Check 'runner.worker_program' in the configuration, or unset it to re-use this binary."
            ),
            Error::ProtocolVersion { .. } => Some(
                "The worker program was built from a different release. Point 'runner.worker_program' at a matching build."
            ),

            Error::Task(TaskError::WorkerExited { .. }) => Some(
                "The worker process crashed or was killed externally. Re-run with RUST_LOG=debug to see its logs."
            ),
            Error::ComputationNotFound { .. } => Some(
                "The worker program does not provide this computation."
            ),

            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let code = self.code();
        let suggestion = self.suggestion();

        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            code.as_str(),
            self
        );

        if let Some(hint) = suggestion {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        let code = self.code();
        format!("[{}] {}", code.as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Error::ConfigNotFound { path: path.into() }
    }

    /// Create a config parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Error::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a malformed protocol message error
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::ProtocolMalformed {
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
