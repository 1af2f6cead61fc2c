//! Run state tracking
//!
//! Tracks the state of a task's current run generation.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────
// Task State
// ─────────────────────────────────────────────────────────────────

/// State of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    /// Never started
    #[default]
    Idle,
    /// A worker process is running
    Running,
    /// The last run returned a value
    Completed,
    /// The last run failed or its worker died
    Failed,
    /// The last run was forcefully stopped
    Stopped,
}

impl TaskState {
    /// Whether a run has ended in this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed | TaskState::Stopped)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Idle => "idle",
            TaskState::Running => "running",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

// ─────────────────────────────────────────────────────────────────
// Run Record
// ─────────────────────────────────────────────────────────────────

/// Bookkeeping of the current run generation
#[derive(Debug, Clone, Default)]
pub struct RunRecord {
    /// Number of runs started so far
    pub generation: u64,

    /// Identifier of the current run
    pub run_id: Option<Uuid>,

    /// Process id of the current worker
    pub pid: Option<u32>,

    /// Current state
    pub state: TaskState,

    /// Wall-clock start of the current run
    pub started_at: Option<DateTime<Utc>>,

    started: Option<Instant>,
    finished: Option<Instant>,
}

impl RunRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new generation
    pub fn mark_running(&mut self, run_id: Uuid, pid: Option<u32>) {
        self.generation += 1;
        self.run_id = Some(run_id);
        self.pid = pid;
        self.state = TaskState::Running;
        self.started_at = Some(Utc::now());
        self.started = Some(Instant::now());
        self.finished = None;
    }

    /// Mark the run as completed
    pub fn mark_completed(&mut self) {
        self.finish(TaskState::Completed);
    }

    /// Mark the run as failed
    pub fn mark_failed(&mut self) {
        self.finish(TaskState::Failed);
    }

    /// Mark the run as stopped
    pub fn mark_stopped(&mut self) {
        self.finish(TaskState::Stopped);
    }

    fn finish(&mut self, state: TaskState) {
        if self.state != TaskState::Running {
            return;
        }
        self.state = state;
        self.finished = Some(Instant::now());
    }

    /// Time spent in the current run, up to now while it is running
    pub fn elapsed(&self) -> Duration {
        match (self.started, self.finished) {
            (Some(start), Some(end)) => end - start,
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
