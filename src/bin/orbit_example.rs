//! Evolve a two-body orbit over a daily grid and write `time phi` rows.
//!
//! Run with:
//!   cargo run --bin orbit_example -- orbit.txt
//!   cargo run --bin orbit_example -- orbit.txt --config orbit.toml --eccentricity 0.2
//!   cargo run --bin orbit_example -- orbit.txt --print-config
//!
//! Without `--config`, `orbit.toml` in the working directory is used when
//! present.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};

use orbitsolver::{evolve, savetxt, OrbitError, RunConfig, SolverKind};

const DEFAULT_CONFIG_PATH: &str = "orbit.toml";

/// Effective one-body orbital phase evolution
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File to write the `time phi` table to
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Path to configuration file (TOML format)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Eccentricity (overrides config file)
    #[arg(short, long, value_name = "E")]
    eccentricity: Option<f64>,

    /// Number of daily samples after the start (overrides config file)
    #[arg(short, long, value_name = "COUNT")]
    days: Option<usize>,

    /// Solver name, e.g. rkf45 (overrides config file)
    #[arg(short, long, value_name = "NAME")]
    solver: Option<String>,

    /// Print the effective configuration as TOML before running
    #[arg(long)]
    print_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, thiserror::Error)]
#[error("unable to write the phase table to {}", .0.display())]
struct WriteFailed(PathBuf);

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::load_or_default(DEFAULT_CONFIG_PATH),
    };
    if let Some(e) = args.eccentricity {
        config.system.eccentricity = e;
    }
    if let Some(days) = args.days {
        config.grid.days = days;
    }
    if let Some(solver) = args.solver {
        config.solver = solver;
    }

    if args.print_config {
        print!("{}", config.to_toml()?);
    }

    let solver: SolverKind = config.solver.parse()?;
    let times = config.grid.times();
    info!(
        "evolving {} samples with {} (M = {} kg, a = {} m, e = {})",
        times.len(),
        solver,
        config.system.mass,
        config.system.semi_major_axis,
        config.system.eccentricity
    );

    let mut phi = Vec::with_capacity(times.len());
    let result = evolve(
        &mut phi,
        &times,
        config.system.mass,
        config.system.semi_major_axis,
        config.system.eccentricity,
        config.system.pericenter_longitude,
        solver,
    );

    match result {
        Ok(()) => write_output(&args.output, &times, &phi),
        Err(OrbitError::Integration(partial)) => {
            // Keep whatever was computed before the failure
            if let Err(e) = write_output(&args.output, &times[..phi.len()], &phi) {
                warn!("{}", e);
            }
            Err(OrbitError::Integration(partial).into())
        }
        Err(e) => Err(e.into()),
    }
}

fn write_output(
    path: &Path,
    times: &[f64],
    phi: &[f64],
) -> Result<(), Box<dyn std::error::Error>> {
    if savetxt(path, times, phi) {
        Ok(())
    } else {
        Err(WriteFailed(path.to_path_buf()).into())
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
