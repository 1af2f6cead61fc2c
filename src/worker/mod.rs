//! Worker process side
//!
//! Entered through the hidden `worker` subcommand. Reads one run request
//! from stdin, runs the named computation through the [`TaskRunner`]
//! wrapper and streams protocol lines to stdout. Logs go to stderr.

mod channel;
mod runner;

pub use channel::*;
pub use runner::*;

use std::io::{self, BufRead};
use std::sync::Arc;

use tracing::{info, warn};

use crate::computation::ComputationRegistry;
use crate::error::{Error, RemoteError, Result};
use crate::protocol::{RunRequest, WorkerMessage};

/// Serve exactly one run request from stdin
pub fn serve_stdio(registry: &ComputationRegistry) -> Result<()> {
    let stdin = io::stdin();
    let channel = Arc::new(WorkerChannel::new(io::stdout()));
    serve(stdin.lock(), channel, registry)
}

/// Serve exactly one run request read from `input`, answering on `channel`
pub fn serve<R: BufRead>(
    mut input: R,
    channel: Arc<WorkerChannel>,
    registry: &ComputationRegistry,
) -> Result<()> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(Error::malformed("stdin closed before a run request arrived"));
    }

    let request = match RunRequest::from_line(&line) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Rejecting malformed run request");
            channel.send(&WorkerMessage::failed(RemoteError::new(e.to_string(), e.format_for_log())))?;
            return Err(e);
        }
    };

    info!(
        run_id = %request.id,
        computation = %request.computation,
        pid = std::process::id(),
        "Worker received run request"
    );

    TaskRunner::new(registry).run(request, channel)
}
