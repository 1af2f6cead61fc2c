//! Computation Registry
//!
//! Maps computation names to runnable implementations inside the worker.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::{Computation, ErasedComputation, Simulation};

/// Computations available to a worker process
#[derive(Default)]
pub struct ComputationRegistry {
    computations: HashMap<&'static str, Arc<dyn ErasedComputation>>,
}

impl ComputationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every computation shipped in this crate
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Simulation);
        registry
    }

    /// Register a computation, replacing any previous one with the same name
    pub fn register<C: Computation>(&mut self, computation: C) {
        if self.computations.insert(C::NAME, Arc::new(computation)).is_some() {
            warn!(computation = C::NAME, "Computation registered twice, keeping the latest");
        } else {
            debug!(computation = C::NAME, "Computation registered");
        }
    }

    /// Look up a computation by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn ErasedComputation>> {
        self.computations
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ComputationNotFound {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.computations.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.computations.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
