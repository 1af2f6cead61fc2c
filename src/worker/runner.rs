//! Task runner wrapper
//!
//! Runs one computation inside the worker process and turns whatever
//! happens into exactly one terminal protocol message. Progress is forced
//! to 1.0 afterwards on every path the process survives.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use crate::computation::ComputationRegistry;
use crate::error::{Error, RemoteError, Result};
use crate::protocol::{RunRequest, WorkerMessage, PROTOCOL_VERSION};

use super::{ProgressReporter, WorkerChannel};

/// Wraps a computation run inside the isolation boundary
pub struct TaskRunner<'a> {
    registry: &'a ComputationRegistry,
}

impl<'a> TaskRunner<'a> {
    pub fn new(registry: &'a ComputationRegistry) -> Self {
        Self { registry }
    }

    /// Run the request, send its outcome, then force progress to 1.0
    pub fn run(&self, request: RunRequest, channel: Arc<WorkerChannel>) -> Result<()> {
        let run_id = request.id;
        let started = Instant::now();
        let reporter = ProgressReporter::new(channel.clone());

        let message = match self.execute(request, &reporter) {
            Ok(value) => {
                info!(
                    run_id = %run_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Computation completed"
                );
                WorkerMessage::Completed { value }
            }
            Err(failure) => {
                error!(run_id = %run_id, error = %failure, "Computation failed");
                WorkerMessage::failed(failure)
            }
        };

        let sent = channel.send(&message);
        reporter.set(1.0);
        sent
    }

    fn execute(
        &self,
        request: RunRequest,
        reporter: &ProgressReporter,
    ) -> std::result::Result<serde_json::Value, RemoteError> {
        if !PROTOCOL_VERSION.accepts(&request.version) {
            let err = Error::ProtocolVersion {
                worker: PROTOCOL_VERSION.to_string(),
                request: request.version.to_string(),
            };
            return Err(RemoteError::new(err.to_string(), err.format_for_log()));
        }

        let computation = self
            .registry
            .get(&request.computation)
            .map_err(|e| RemoteError::new(e.to_string(), e.format_for_log()))?;

        let args = request.args;
        match panic::catch_unwind(AssertUnwindSafe(|| computation.run_json(args, reporter))) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(RemoteError::from_anyhow(&err)),
            Err(payload) => Err(panic_failure(payload)),
        }
    }
}

fn panic_failure(payload: Box<dyn Any + Send>) -> RemoteError {
    let detail = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    RemoteError::new(
        format!("computation panicked: {}", detail),
        format!("computation panicked: {}\n(set RUST_BACKTRACE=1 on the worker for a backtrace)", detail),
    )
}
