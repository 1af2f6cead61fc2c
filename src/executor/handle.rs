//! Worker process handle
//!
//! Owns one spawned worker. A supervisor task feeds it the run request,
//! mirrors its progress lines into a [`ProgressCell`], waits for it to exit
//! (or kills it on request) and hands the exit over a one-shot channel.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::RunnerConfig;
use crate::error::{Error, Result};
use crate::protocol::{Outcome, RunRequest, WorkerMessage};

use super::ProgressCell;

// ─────────────────────────────────────────────────────────────────
// Worker Launcher
// ─────────────────────────────────────────────────────────────────

/// How to start a worker process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl WorkerLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Re-execute the running binary in worker mode
    pub fn current_exe() -> Result<Self> {
        let exe = std::env::current_exe()?;
        Ok(Self::new(exe).arg("worker"))
    }

    /// Launcher named by the runner configuration, or the running binary
    pub fn from_config(config: &RunnerConfig) -> Result<Self> {
        match &config.worker_program {
            Some(program) => Ok(Self::new(program).arg("worker")),
            None => Self::current_exe(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        command
    }
}

// ─────────────────────────────────────────────────────────────────
// Worker Exit
// ─────────────────────────────────────────────────────────────────

/// How a worker process ended
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerExit {
    /// Exit status as reported by the OS
    pub status: String,

    /// Whether the process was killed through its handle
    pub killed: bool,

    /// Terminal message the worker sent, if any
    pub outcome: Option<Outcome>,
}

fn describe_status(status: std::io::Result<ExitStatus>) -> String {
    match status {
        Ok(status) => status.to_string(),
        Err(e) => format!("unknown ({})", e),
    }
}

// ─────────────────────────────────────────────────────────────────
// Execution Handle
// ─────────────────────────────────────────────────────────────────

/// Live worker process of one run generation
///
/// Dropping the handle kills the process.
pub struct ExecutionHandle {
    pid: Option<u32>,
    done: watch::Receiver<bool>,
    kill_tx: Option<oneshot::Sender<()>>,
    exit_rx: Option<oneshot::Receiver<WorkerExit>>,
}

impl ExecutionHandle {
    /// Spawn a worker for `request`, mirroring its progress into `progress`
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn(launcher: &WorkerLauncher, request: &RunRequest, progress: ProgressCell) -> Result<Self> {
        let line = request.to_line()?;

        let mut child = launcher.command().spawn().map_err(|source| Error::WorkerSpawn {
            program: launcher.program.clone(),
            source,
        })?;
        let pid = child.id();
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();

        let (done_tx, done_rx) = watch::channel(false);
        let (kill_tx, kill_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = oneshot::channel();

        let supervisor = Supervisor {
            run_id: request.id,
            child,
            progress,
        };
        tokio::spawn(async move {
            let exit = supervisor.run(stdin, stdout, line, kill_rx).await;
            let _ = exit_tx.send(exit);
            done_tx.send_replace(true);
        });

        Ok(Self {
            pid,
            done: done_rx,
            kill_tx: Some(kill_tx),
            exit_rx: Some(exit_rx),
        })
    }

    /// OS process id of the worker
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Whether the worker has not yet finished and been reaped
    pub fn is_alive(&self) -> bool {
        let finished = *self.done.borrow();
        // A closed channel means the supervisor is gone
        !finished && self.done.has_changed().is_ok()
    }

    /// Wait until the worker has finished and been reaped
    pub async fn wait(&self) {
        let mut done = self.done.clone();
        let _ = done.wait_for(|finished| *finished).await;
    }

    /// Kill the worker and wait for the reap
    pub async fn terminate(&mut self) {
        if let Some(kill_tx) = self.kill_tx.take() {
            let _ = kill_tx.send(());
        }
        self.wait().await;
    }

    /// Take the exit record once the worker has finished
    ///
    /// Returns `None` while the worker is still running, if the supervisor
    /// was lost, or on every call after the first.
    pub fn take_exit(&mut self) -> Option<WorkerExit> {
        let exit = self.exit_rx.as_mut()?.try_recv().ok()?;
        self.exit_rx = None;
        Some(exit)
    }
}

impl std::fmt::Debug for ExecutionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionHandle")
            .field("pid", &self.pid)
            .field("alive", &self.is_alive())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────
// Supervisor
// ─────────────────────────────────────────────────────────────────

struct Supervisor {
    run_id: Uuid,
    child: Child,
    progress: ProgressCell,
}

impl Supervisor {
    async fn run(
        mut self,
        stdin: Option<ChildStdin>,
        stdout: Option<ChildStdout>,
        request: String,
        kill_rx: oneshot::Receiver<()>,
    ) -> WorkerExit {
        if let Some(mut stdin) = stdin {
            if let Err(e) = stdin.write_all(request.as_bytes()).await {
                warn!(run_id = %self.run_id, error = %e, "Failed to send run request to worker");
            }
            // Closing stdin marks the end of the request
            drop(stdin);
        }

        let reader: Option<JoinHandle<Option<Outcome>>> = stdout
            .map(|stdout| tokio::spawn(read_messages(self.run_id, stdout, self.progress.clone())));

        let child = &mut self.child;
        let (status, killed) = tokio::select! {
            status = child.wait() => (status, false),
            // Also taken when the handle is dropped
            _ = kill_rx => {
                if let Err(e) = child.kill().await {
                    warn!(run_id = %self.run_id, error = %e, "Failed to kill worker");
                }
                (child.wait().await, true)
            }
        };

        let outcome = match reader {
            Some(reader) if killed => {
                reader.abort();
                // Progress must not move once the kill has been observed
                let _ = reader.await;
                None
            }
            Some(reader) => reader.await.ok().flatten(),
            None => None,
        };

        let status = describe_status(status);
        debug!(
            run_id = %self.run_id,
            status = %status,
            killed,
            has_outcome = outcome.is_some(),
            "Worker process finished"
        );

        WorkerExit {
            status,
            killed,
            outcome,
        }
    }
}

/// Read protocol lines until the worker closes stdout
async fn read_messages(run_id: Uuid, stdout: ChildStdout, progress: ProgressCell) -> Option<Outcome> {
    let mut lines = BufReader::new(stdout).lines();
    let mut outcome = None;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "Failed to read from worker");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match WorkerMessage::from_line(&line) {
            Ok(WorkerMessage::Progress { value }) => progress.set(value),
            Ok(message) if outcome.is_none() => outcome = message.into_outcome(),
            Ok(message) => {
                warn!(run_id = %run_id, kind = message.type_name(), "Ignoring second terminal message");
            }
            Err(e) => warn!(run_id = %run_id, error = %e, "Skipping unreadable worker output"),
        }
    }

    outcome
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
