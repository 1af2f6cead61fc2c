//! longtask - run long computations in a killable worker process
//!
//! A [`executor::Task`] runs a [`computation::Computation`] in a separate
//! OS process (the same binary in worker mode), mirrors the progress it
//! reports and can kill it at any point. Failures inside the worker,
//! panics included, come back as [`error::TaskError`] values.

pub mod computation;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod protocol;
pub mod worker;

pub use computation::{Computation, Simulation, SimulationArgs, SimulationReport};
pub use error::{Error, Result, TaskError};
pub use executor::{ProgressCell, Task, TaskState, WorkerLauncher};
