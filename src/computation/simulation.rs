//! Time-stepped numeric simulation
//!
//! A scalar driven by a constant power and damped by a proportional loss,
//! advanced in 0.1 s steps. Each step sleeps briefly to stand in for real
//! work.

use std::thread;
use std::time::Duration;

use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::worker::ProgressReporter;

use super::Computation;

/// Simulated time advanced by one step, in seconds
pub const TIME_STEP_SECS: f64 = 0.1;

const STEPS_PER_SECOND: f64 = 10.0;

/// Fraction of the current value lost per step
const LOSS_RATE: f64 = 0.01;

fn default_step_delay_ms() -> u64 {
    10
}

/// Arguments of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationArgs {
    /// Simulated duration in seconds
    pub duration: f64,

    /// Initial value
    pub input1: f64,

    /// Drive power
    pub input2: f64,

    /// Wall-clock delay per step in milliseconds
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
}

impl SimulationArgs {
    pub fn new(duration: f64, input1: f64, input2: f64) -> Self {
        Self {
            duration,
            input1,
            input2,
            step_delay_ms: default_step_delay_ms(),
        }
    }

    pub fn with_step_delay_ms(mut self, step_delay_ms: u64) -> Self {
        self.step_delay_ms = step_delay_ms;
        self
    }

    /// Number of steps covering the duration
    pub fn total_steps(&self) -> usize {
        (self.duration * STEPS_PER_SECOND).floor() as usize
    }
}

/// Result of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub message: String,

    /// Simulated time of each step
    pub time: Vec<f64>,

    /// Value after each step
    pub values: Vec<f64>,
}

/// The simulation computation
#[derive(Debug, Clone, Copy, Default)]
pub struct Simulation;

impl Computation for Simulation {
    const NAME: &'static str = "simulation";
    const STOP_MESSAGE: &'static str = "Simulation was stopped.";

    type Args = SimulationArgs;
    type Output = SimulationReport;

    fn run(&self, args: SimulationArgs, progress: &ProgressReporter) -> anyhow::Result<SimulationReport> {
        ensure!(
            args.duration.is_finite() && args.duration > 0.0,
            "duration must be a positive number of seconds, got {}",
            args.duration
        );
        ensure!(
            args.input1.is_finite() && args.input2.is_finite(),
            "inputs must be finite, got input1={} input2={}",
            args.input1,
            args.input2
        );

        let total_steps = args.total_steps();
        let delay = Duration::from_millis(args.step_delay_ms);
        debug!(total_steps, step_delay_ms = args.step_delay_ms, "Simulation starting");

        let mut y = args.input1;
        let power = args.input2;
        let mut time = Vec::new();
        let mut values = Vec::new();

        for step in 0..total_steps {
            let loss = y * LOSS_RATE;
            let dy = power / 10.0 - loss;
            y += dy;

            if !y.is_finite() {
                bail!("simulation diverged at step {} (t = {:.1}s)", step, step as f64 * TIME_STEP_SECS);
            }

            values.push(y);
            time.push(step as f64 * TIME_STEP_SECS);

            if progress.get() >= 1.0 {
                break;
            }
            progress.set(step as f64 / total_steps as f64);

            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }

        Ok(SimulationReport {
            message: "Simulation complete!".to_string(),
            time,
            values,
        })
    }
}
