//! Protocol message definitions
//!
//! Worker messages are serialized as JSON with a `type` discriminator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, RemoteError, Result};

use super::ProtocolVersion;

// ─────────────────────────────────────────────────────────────────
// Controller → Worker
// ─────────────────────────────────────────────────────────────────

/// The single request a worker process serves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    /// Unique run identifier, used for log correlation
    pub id: Uuid,

    /// When the controller issued the request
    pub issued_at: DateTime<Utc>,

    /// Protocol version of the controller
    pub version: ProtocolVersion,

    /// Registered name of the computation to run
    pub computation: String,

    /// Computation-specific arguments
    pub args: serde_json::Value,
}

impl RunRequest {
    pub fn new(computation: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            issued_at: Utc::now(),
            version: ProtocolVersion::default(),
            computation: computation.into(),
            args,
        }
    }

    /// Encode as one protocol line, newline included
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Decode one protocol line
    pub fn from_line(line: &str) -> Result<Self> {
        serde_json::from_str(line.trim())
            .map_err(|e| Error::malformed(format!("run request: {}", e)))
    }
}

// ─────────────────────────────────────────────────────────────────
// Worker → Controller
// ─────────────────────────────────────────────────────────────────

/// Everything a worker writes to stdout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// New progress reading
    Progress { value: f64 },

    /// The computation returned a value
    Completed { value: serde_json::Value },

    /// The computation failed
    Failed { message: String, trace: String },
}

impl WorkerMessage {
    /// Get the message type name
    pub fn type_name(&self) -> &'static str {
        match self {
            WorkerMessage::Progress { .. } => "PROGRESS",
            WorkerMessage::Completed { .. } => "COMPLETED",
            WorkerMessage::Failed { .. } => "FAILED",
        }
    }

    /// Build the terminal message for a failure
    pub fn failed(error: RemoteError) -> Self {
        WorkerMessage::Failed {
            message: error.message,
            trace: error.trace,
        }
    }

    /// Turn a terminal message into the run outcome; `None` for progress
    pub fn into_outcome(self) -> Option<Outcome> {
        match self {
            WorkerMessage::Progress { .. } => None,
            WorkerMessage::Completed { value } => Some(Outcome::Completed(value)),
            WorkerMessage::Failed { message, trace } => {
                Some(Outcome::Failed(RemoteError { message, trace }))
            }
        }
    }

    /// Encode as one protocol line, without the newline
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode one protocol line
    pub fn from_line(line: &str) -> Result<Self> {
        serde_json::from_str(line.trim())
            .map_err(|e| Error::malformed(format!("worker message: {}", e)))
    }
}

/// Untyped result of one run, produced exactly once
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed(serde_json::Value),
    Failed(RemoteError),
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
