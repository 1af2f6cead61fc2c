//! Controller side of a run
//!
//! Handles the run lifecycle:
//! - Spawning the worker process and streaming its progress
//! - Forceful termination and reaping
//! - Caching the single outcome of each run generation

mod handle;
mod progress;
mod state;
mod task;

pub use handle::*;
pub use progress::*;
pub use state::*;
pub use task::*;
