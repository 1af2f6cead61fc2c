//! longtask - run long computations in a killable worker process
//!
//! This is the main entry point for the longtask binary. The same binary
//! serves as controller (`run`) and, re-executed with the hidden `worker`
//! subcommand, as the isolated worker process.

mod cli;

use std::time::Duration;

use clap::Parser;
use tracing::{info, Level};

use longtask::computation::{ComputationRegistry, Simulation, SimulationReport};
use longtask::config::{self, LongtaskConfig};
use longtask::error::{Error, Result};
use longtask::executor::Task;
use longtask::{logging, worker};

use crate::cli::{Cli, Commands, ConfigSubcommand, RunArgs};

fn main() {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli) {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Worker => {
            // stdout carries protocol lines; logs stay on stderr
            logging::init_simple(Level::WARN)?;
            worker::serve_stdio(&ComputationRegistry::with_builtin())
        }
        Commands::Config { subcommand } => {
            // Config commands use minimal logging
            logging::init_simple(Level::WARN)?;
            handle_config_command(subcommand)
        }
        Commands::Run(args) => {
            let config = LongtaskConfig::load(args.config.as_deref())?;

            // The guards must be kept alive for the lifetime of the program
            let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;
            info!(version = env!("CARGO_PKG_VERSION"), "Starting longtask");

            run_simulation(config, args, cli.quiet)
        }
    }
}

/// Run the simulation as a task, reporting progress until it ends
fn run_simulation(mut config: LongtaskConfig, args: RunArgs, quiet: bool) -> Result<()> {
    apply_run_overrides(&mut config, &args);
    config.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("longtask")
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

    let report = runtime.block_on(drive(&config, args.stop_at, !(quiet || args.json)))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// CLI arguments take precedence over the configuration
fn apply_run_overrides(config: &mut LongtaskConfig, args: &RunArgs) {
    if let Some(duration) = args.duration {
        config.simulation.duration_secs = duration;
    }
    if let Some(input1) = args.input1 {
        config.simulation.input1 = input1;
    }
    if let Some(input2) = args.input2 {
        config.simulation.input2 = input2;
    }
    if let Some(delay) = args.step_delay_ms {
        config.simulation.step_delay_ms = delay;
    }
    if let Some(interval) = args.poll_interval_ms {
        config.runner.poll_interval_ms = interval;
    }
}

async fn drive(config: &LongtaskConfig, stop_at: Option<f64>, show_progress: bool) -> Result<SimulationReport> {
    let mut task: Task<Simulation> = Task::from_config(&config.runner)?;
    task.start(config.simulation.to_args())?;

    let mut ticker = tokio::time::interval(Duration::from_millis(config.runner.poll_interval_ms));
    while task.alive() {
        ticker.tick().await;

        let progress = task.progress();
        if show_progress {
            println!("Progress: {:.2}%", progress * 100.0);
        }

        if let Some(threshold) = stop_at {
            if progress >= threshold {
                info!(progress, threshold, "Stopping task at threshold");
                task.stop().await;
                break;
            }
        }
    }

    let report = task
        .result()
        .await?
        .ok_or_else(|| Error::Internal("task finished without being started".to_string()))?;

    info!(
        run_id = ?task.run_id(),
        elapsed_ms = task.elapsed().as_millis() as u64,
        steps = report.values.len(),
        "Task completed"
    );
    Ok(report)
}

fn print_report(report: &SimulationReport) {
    println!("{}", report.message);
    println!("Steps: {}", report.values.len());
    if let (Some(time), Some(value)) = (report.time.last(), report.values.last()) {
        println!("Final value: {:.6} (t = {:.1}s)", value, time);
    }
}

/// Handle config subcommands
fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = LongtaskConfig::load(config.as_deref())?;
            match &cfg.source {
                Some(path) => println!("# Loaded from {}", path.display()),
                None => println!("# No configuration file found, showing defaults"),
            }
            println!("{}", cfg.to_toml()?);
        }
        ConfigSubcommand::Init { path, force } => {
            let path = config::init_config(path.as_deref(), force)?;
            println!("Configuration file created: {}", path.display());
        }
        ConfigSubcommand::Validate { config } => {
            LongtaskConfig::load(config.as_deref())?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
