//! Shared progress scalar
//!
//! A single `f64` in `[0, 1]` stored as raw bits in an atomic. There is
//! exactly one writer per run generation; readers may see a stale value
//! but never a torn one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Fractional completion of one run, shared between its writer and readers
#[derive(Debug, Clone, Default)]
pub struct ProgressCell {
    bits: Arc<AtomicU64>,
}

impl ProgressCell {
    /// Create a cell reading 0.0
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Store a value, clamped into `[0, 1]` (NaN reads as 0)
    pub fn set(&self, value: f64) {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    /// Back to 0.0
    pub fn reset(&self) {
        self.set(0.0);
    }

    /// Force the terminal reading
    pub fn complete(&self) {
        self.set(1.0);
    }

    pub fn is_complete(&self) -> bool {
        self.get() >= 1.0
    }
}
