//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface of longtask.

use clap::{Args, Parser, Subcommand};

/// longtask - run long computations in a separate, killable process
///
/// Runs the numeric simulation as an isolated task, reports its progress
/// while it runs and can stop it forcefully partway through.
#[derive(Parser, Debug)]
#[command(name = "longtask")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the simulation in a separate process and report its progress
    Run(RunArgs),

    /// Serve one run request from stdin (used by the controller)
    #[command(hide = true)]
    Worker,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Options of `longtask run`; unset values come from the configuration
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, env = "LONGTASK_CONFIG")]
    pub config: Option<String>,

    /// Simulated duration in seconds
    #[arg(short, long, allow_negative_numbers = true)]
    pub duration: Option<f64>,

    /// Initial value
    #[arg(long, allow_negative_numbers = true)]
    pub input1: Option<f64>,

    /// Drive power
    #[arg(long, allow_negative_numbers = true)]
    pub input2: Option<f64>,

    /// Wall-clock delay per simulation step in milliseconds
    #[arg(long)]
    pub step_delay_ms: Option<u64>,

    /// Stop the run once progress reaches this fraction (0 to 1)
    #[arg(long, value_parser = parse_fraction)]
    pub stop_at: Option<f64>,

    /// Interval between progress reports in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn parse_fraction(value: &str) -> Result<f64, String> {
    let fraction: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if (0.0..=1.0).contains(&fraction) {
        Ok(fraction)
    } else {
        Err(format!("{} is not between 0 and 1", fraction))
    }
}
