//! Computations a worker process can run
//!
//! A computation is any type implementing [`Computation`]. The registry
//! erases its argument and output types to JSON so the worker can look it
//! up by the name carried in the run request.

mod registry;
mod simulation;
mod traits;

pub use registry::*;
pub use simulation::{Simulation, SimulationArgs, SimulationReport};
pub use traits::*;
