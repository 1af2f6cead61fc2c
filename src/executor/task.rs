//! Controller-facing task
//!
//! A [`Task`] runs one [`Computation`] at a time in a worker process and can
//! be polled for progress, stopped, joined and asked for its result. Each
//! `start` opens a new run generation with fresh progress and no outcome.

use std::marker::PhantomData;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::computation::Computation;
use crate::config::RunnerConfig;
use crate::error::{Error, Result, TaskError};
use crate::protocol::{Outcome, RunRequest};

use super::{ExecutionHandle, ProgressCell, RunRecord, TaskState, WorkerExit, WorkerLauncher};

type CachedOutcome<T> = std::result::Result<T, TaskError>;

/// A restartable, forcefully stoppable run of `C` in a worker process
pub struct Task<C: Computation> {
    launcher: WorkerLauncher,
    stop_message: String,
    progress: ProgressCell,
    handle: Option<ExecutionHandle>,
    outcome: Option<CachedOutcome<C::Output>>,
    record: RunRecord,
    _computation: PhantomData<fn() -> C>,
}

impl<C: Computation> Task<C> {
    /// Create an idle task that will launch workers with `launcher`
    pub fn new(launcher: WorkerLauncher) -> Self {
        Self {
            launcher,
            stop_message: C::STOP_MESSAGE.to_string(),
            progress: ProgressCell::new(),
            handle: None,
            outcome: None,
            record: RunRecord::new(),
            _computation: PhantomData,
        }
    }

    /// Create a task from the runner configuration
    pub fn from_config(config: &RunnerConfig) -> Result<Self> {
        let mut task = Self::new(WorkerLauncher::from_config(config)?);
        if let Some(message) = &config.stop_message {
            task.stop_message = message.clone();
        }
        Ok(task)
    }

    /// Override the message carried by the cancellation error
    pub fn with_stop_message(mut self, message: impl Into<String>) -> Self {
        self.stop_message = message.into();
        self
    }

    pub fn stop_message(&self) -> &str {
        &self.stop_message
    }

    // ─────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────

    /// Start a run in a fresh worker process
    ///
    /// Does nothing while a run is alive. Never waits for the computation.
    /// Must be called within a tokio runtime.
    pub fn start(&mut self, args: C::Args) -> Result<()> {
        if self.alive() {
            debug!(generation = self.record.generation, "Task already running, start ignored");
            return Ok(());
        }

        let request = RunRequest::new(C::NAME, serde_json::to_value(&args)?);

        // Reset before spawning so nothing from the previous generation leaks in
        self.progress = ProgressCell::new();
        self.outcome = None;
        self.handle = None;

        let handle = ExecutionHandle::spawn(&self.launcher, &request, self.progress.clone())?;
        self.record.mark_running(request.id, handle.pid());
        self.handle = Some(handle);

        info!(
            run_id = %request.id,
            pid = ?self.record.pid,
            generation = self.record.generation,
            computation = C::NAME,
            "Task started"
        );
        Ok(())
    }

    /// Kill the running worker and record the cancellation
    ///
    /// Does nothing unless a run is alive. Progress stays where it was.
    pub async fn stop(&mut self) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        if !handle.is_alive() {
            return;
        }

        handle.terminate().await;
        // Whatever the worker managed to report is superseded
        let _ = handle.take_exit();

        self.outcome = Some(Err(TaskError::Cancelled {
            message: self.stop_message.clone(),
        }));
        self.record.mark_stopped();

        info!(
            run_id = ?self.record.run_id,
            generation = self.record.generation,
            progress = self.progress.get(),
            "Task stopped"
        );
    }

    /// Wait until the current run has finished
    pub async fn join(&self) {
        if let Some(handle) = &self.handle {
            handle.wait().await;
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Observation
    // ─────────────────────────────────────────────────────────────

    /// Progress of the current run in `[0, 1]`
    pub fn progress(&self) -> f64 {
        self.progress.get()
    }

    /// Whether a worker process is running
    pub fn alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| handle.is_alive())
    }

    /// Wait for the current run and return its value
    ///
    /// `Ok(None)` if the task was never started. The outcome is cached, so
    /// repeated calls return the same value or error.
    pub async fn result(&mut self) -> Result<Option<C::Output>> {
        if self.handle.is_none() {
            return Ok(None);
        }

        self.join().await;
        self.settle();

        match &self.outcome {
            Some(Ok(value)) => Ok(Some(value.clone())),
            Some(Err(err)) => Err(Error::Task(err.clone())),
            None => Err(Error::Internal("run finished without an outcome".to_string())),
        }
    }

    /// Error of the finished run, if any; `None` while it is running
    pub fn exception(&mut self) -> Option<TaskError> {
        if self.alive() {
            return None;
        }
        self.settle();

        match &self.outcome {
            Some(Err(err)) => Some(err.clone()),
            _ => None,
        }
    }

    /// State of the current run
    pub fn state(&mut self) -> TaskState {
        if !self.alive() {
            self.settle();
        }
        self.record.state
    }

    /// Number of runs started so far
    pub fn generation(&self) -> u64 {
        self.record.generation
    }

    /// Identifier of the current run
    pub fn run_id(&self) -> Option<Uuid> {
        self.record.run_id
    }

    /// Process id of the current worker
    pub fn pid(&self) -> Option<u32> {
        self.record.pid
    }

    /// Time spent in the current run
    pub fn elapsed(&self) -> Duration {
        self.record.elapsed()
    }

    // ─────────────────────────────────────────────────────────────
    // Outcome
    // ─────────────────────────────────────────────────────────────

    /// Cache the outcome of a finished run, once
    fn settle(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        if handle.is_alive() {
            return;
        }

        let outcome = interpret::<C::Output>(handle.take_exit());
        match &outcome {
            Ok(_) => self.record.mark_completed(),
            Err(err) => {
                warn!(
                    run_id = ?self.record.run_id,
                    generation = self.record.generation,
                    error = %err,
                    "Task failed"
                );
                self.record.mark_failed();
            }
        }
        self.outcome = Some(outcome);
    }
}

impl<C: Computation> std::fmt::Debug for Task<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("computation", &C::NAME)
            .field("state", &self.record.state)
            .field("generation", &self.record.generation)
            .field("progress", &self.progress.get())
            .finish()
    }
}

/// Turn a worker exit into the typed outcome
fn interpret<T: serde::de::DeserializeOwned>(exit: Option<WorkerExit>) -> CachedOutcome<T> {
    let Some(exit) = exit else {
        return Err(TaskError::WorkerExited {
            status: "supervisor lost".to_string(),
        });
    };

    match exit.outcome {
        Some(Outcome::Completed(value)) => {
            serde_json::from_value(value).map_err(|e| TaskError::MalformedOutcome(e.to_string()))
        }
        Some(Outcome::Failed(remote)) => Err(TaskError::Computation(remote)),
        None => Err(TaskError::WorkerExited { status: exit.status }),
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
