//! Computation trait definitions

use std::fmt;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::worker::ProgressReporter;

/// Stop message used when a computation does not declare its own
pub const DEFAULT_STOP_MESSAGE: &str = "Process was forcefully terminated.";

/// A long-running unit of work
///
/// `run` executes inside the worker process. It should report progress
/// through `progress` as it goes; the wrapper forces the final 1.0.
pub trait Computation: Send + Sync + 'static {
    /// Name under which the worker registry finds this computation
    const NAME: &'static str;

    /// Message carried by the cancellation error when a run is stopped
    const STOP_MESSAGE: &'static str = DEFAULT_STOP_MESSAGE;

    /// Arguments passed to `start`
    type Args: Serialize + DeserializeOwned + Send + fmt::Debug;

    /// Value returned by a successful run
    type Output: Serialize + DeserializeOwned + Clone + Send + fmt::Debug;

    /// Run to completion, or fail
    fn run(&self, args: Self::Args, progress: &ProgressReporter) -> anyhow::Result<Self::Output>;
}

/// Object-safe view of a [`Computation`] working on JSON values
pub trait ErasedComputation: Send + Sync {
    fn name(&self) -> &'static str;

    fn run_json(
        &self,
        args: serde_json::Value,
        progress: &ProgressReporter,
    ) -> anyhow::Result<serde_json::Value>;
}

impl<C: Computation> ErasedComputation for C {
    fn name(&self) -> &'static str {
        C::NAME
    }

    fn run_json(
        &self,
        args: serde_json::Value,
        progress: &ProgressReporter,
    ) -> anyhow::Result<serde_json::Value> {
        let args: C::Args = serde_json::from_value(args)
            .with_context(|| format!("invalid arguments for computation '{}'", C::NAME))?;
        let output = self.run(args, progress)?;
        serde_json::to_value(output)
            .with_context(|| format!("failed to encode output of computation '{}'", C::NAME))
    }
}
