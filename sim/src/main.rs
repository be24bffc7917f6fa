//! MCL SIM: replay driver for the landmark-based Monte Carlo localizer.
//!
//! Feeds a recorded telemetry CSV through the particle filter against a known
//! landmark map and writes the resulting pose track (and, when the recording
//! carries ground truth, the per-step weight-averaged error).
//!
//! You can run a replay either by:
//!   1. Loading all parameters from a configuration file (TOML/JSON/YAML)
//!   2. Specifying parameters via command-line flags
//!
//! Use the `config` subcommand to generate a template configuration file.

mod common;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use common::{init_logger, validate_input_file, validate_output_file};
use log::{info, warn};

use mcl::map::Map;
use mcl::sim::{run_filter, EstimateRecord, RunConfig, TelemetryRecord};

/// Command line arguments
#[derive(Parser)]
#[command(
    author,
    version,
    about = "Replay recorded telemetry through the landmark-based Monte Carlo localizer."
)]
struct Cli {
    /// Command to execute
    #[command(subcommand)]
    command: Command,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log file path (if not specified, logs to stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

/// Top-level commands
#[derive(Subcommand, Clone)]
enum Command {
    #[command(
        name = "run",
        about = "Replay a telemetry recording through the filter",
        long_about = "Replay a telemetry recording through the particle filter. The first record initializes the filter from its measured pose; every subsequent record runs a full predict/update/resample cycle. Estimates are written as CSV."
    )]
    Run(RunArgs),

    #[command(name = "config", about = "Generate a template configuration file")]
    CreateConfig(CreateConfigArgs),
}

/// Replay arguments
#[derive(Args, Clone, Debug)]
struct RunArgs {
    /// Landmark map file (one `x y id` triple per line)
    #[arg(short, long, value_parser)]
    map: PathBuf,

    /// Input telemetry CSV file path
    #[arg(short, long, value_parser)]
    input: PathBuf,

    /// Output estimates CSV file path
    #[arg(short, long, value_parser)]
    output: PathBuf,

    /// Run configuration file (TOML/JSON/YAML); flags below override it
    #[arg(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Number of particles
    #[arg(long)]
    num_particles: Option<usize>,

    /// RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Landmark sensor range (meters)
    #[arg(long)]
    sensor_range: Option<f64>,

    /// Elapsed time between telemetry records (seconds)
    #[arg(long)]
    delta_t: Option<f64>,
}

/// Arguments for the config template command
#[derive(Args, Clone, Debug)]
struct CreateConfigArgs {
    /// Output path for the config file; the extension selects the format
    /// (.json, .yaml/.yml, or .toml)
    #[arg(short, long, value_parser)]
    output: PathBuf,
}

fn build_config(args: &RunArgs) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RunConfig::default(),
    };
    if let Some(num_particles) = args.num_particles {
        config.num_particles = num_particles;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(sensor_range) = args.sensor_range {
        config.sensor_range = sensor_range;
    }
    if let Some(delta_t) = args.delta_t {
        config.delta_t = delta_t;
    }
    Ok(config)
}

fn run_replay(args: &RunArgs) -> Result<()> {
    validate_input_file(&args.map).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    validate_input_file(&args.input).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    validate_output_file(&args.output).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let config = build_config(args)?;
    info!(
        "Running with {} particles, seed {}, sensor range {} m",
        config.num_particles, config.seed, config.sensor_range
    );

    let map = Map::from_file(&args.map)
        .with_context(|| format!("failed to load map from {}", args.map.display()))?;
    info!("Loaded {} landmarks from {}", map.len(), args.map.display());

    let records = TelemetryRecord::from_csv(&args.input)
        .map_err(|e| anyhow::anyhow!(e.to_string()))
        .with_context(|| format!("failed to read telemetry from {}", args.input.display()))?;
    info!(
        "Read {} telemetry records from {}",
        records.len(),
        args.input.display()
    );

    let results = run_filter(&records, &map, &config).context("replay failed")?;
    info!("Generated {} estimates", results.len());

    let scored: Vec<f64> = results.iter().filter_map(|r| r.weighted_error).collect();
    if scored.is_empty() {
        warn!("Recording carries no ground truth; no error summary available");
    } else {
        let mean = scored.iter().sum::<f64>() / scored.len() as f64;
        info!(
            "Mean weighted error over {} scored steps: {:.4}",
            scored.len(),
            mean
        );
    }

    EstimateRecord::to_csv(&results, &args.output)
        .with_context(|| format!("failed to write estimates to {}", args.output.display()))?;
    info!("Results written to {}", args.output.display());
    Ok(())
}

fn create_config(args: &CreateConfigArgs) -> Result<()> {
    validate_output_file(&args.output).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    RunConfig::default()
        .to_file(&args.output)
        .with_context(|| format!("failed to write config to {}", args.output.display()))?;
    info!("Template configuration written to {}", args.output.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(&cli.log_level, cli.log_file.as_ref())
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    match &cli.command {
        Command::Run(args) => run_replay(args),
        Command::CreateConfig(args) => create_config(args),
    }
}
