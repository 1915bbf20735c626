//! Diffusion Simulator
//!
//! Runs one simulation described by a TOML file and writes its checkpoint
//! directory (`iterations.jsonl`, `states.json`, `summary.json`).

use clap::Parser;
use diffusion_core::checkpoint::{Checkpoint, SimulationReader, SimulationWriter};
use diffusion_core::config::{default_config_toml, RunConfig, StopConfig};
use diffusion_core::{load_data, DiffusionData, Protocol, Simulation, SimulationError};
use diffusion_events::{generate_run_id, Clock};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Command line arguments for the simulator
#[derive(Parser, Debug)]
#[command(name = "diffusion_sim")]
#[command(about = "Simulates information diffusion over a social network")]
struct Args {
    /// Run configuration file
    #[arg(long, required_unless_present = "print_default_config")]
    config: Option<PathBuf>,

    /// Overrides the configured random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides the configured output directory
    #[arg(long)]
    output: Option<PathBuf>,

    /// Extra cap on the number of iterations after seeding
    #[arg(long)]
    max_iterations: Option<u64>,

    /// Continues the run stored in this checkpoint directory
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Prints a configuration template and exits
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if args.print_default_config {
        print!("{}", default_config_toml());
        return ExitCode::SUCCESS;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let Some(config_path) = args.config else {
        return Err("--config is required".into());
    };
    let mut config = RunConfig::from_file(&config_path)?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(output) = args.output {
        config.output.dir = output;
    }
    if let Some(max) = args.max_iterations {
        config.protocol.stop.push(StopConfig::NumIterations {
            limit: i64::try_from(max).unwrap_or(i64::MAX),
        });
    }

    let data = load_data(&config.data)?;
    let protocol = config.protocol.build(&data)?;

    let (mut sim, run_id) = match &args.resume {
        Some(dir) => {
            let checkpoint = SimulationReader::new(dir).read_checkpoint()?;
            resume_simulation(&data, protocol, config.seed, config.clock, checkpoint)?
        }
        None => (
            Simulation::new(&data, protocol, config.seed)?.with_clock(config.clock),
            generate_run_id(),
        ),
    };

    let mut writer = SimulationWriter::new(&config.output.dir)?;
    writer.write_iterations(sim.iterations())?;
    while !sim.is_stopped() {
        let iteration = sim.step()?;
        writer.write_iteration(iteration)?;
    }
    let summary = sim.summary(&run_id);
    writer.write_checkpoint(sim.states(), &summary)?;

    tracing::info!(
        "Run {} finished after {} iterations: {} propagations by {} users, written to {:?}",
        run_id,
        summary.iterations,
        summary.total_propagated,
        summary.total_propagating_users,
        writer.output_dir()
    );
    Ok(())
}

/// Resumes a checkpoint and returns it with its run id.
///
/// The clock recorded in the summary wins; a checkpoint without a summary
/// gets a fresh run id and continues on the configured clock.
fn resume_simulation<'a>(
    data: &'a DiffusionData,
    protocol: Protocol,
    seed: u64,
    clock: Clock,
    checkpoint: Checkpoint,
) -> Result<(Simulation<'a>, String), SimulationError> {
    match checkpoint.summary.as_ref().map(|s| s.run_id.clone()) {
        Some(run_id) => Ok((Simulation::resume(data, protocol, seed, checkpoint)?, run_id)),
        None => {
            tracing::warn!("Checkpoint has no summary, continuing on the configured clock {}", clock);
            let sim = Simulation::resume(data, protocol, seed, checkpoint)?.with_clock(clock);
            Ok((sim, generate_run_id()))
        }
    }
}
