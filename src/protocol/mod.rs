//! Protocol module for controller/worker communication
//!
//! The controller writes one `RunRequest` line to the worker's stdin; the
//! worker answers with `WorkerMessage` lines on stdout. Every line is a
//! single JSON document.

mod messages;
mod version;

pub use messages::*;
pub use version::*;
