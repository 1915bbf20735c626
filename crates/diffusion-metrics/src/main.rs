//! Diffusion Metrics
//!
//! Evaluates a run directory written by `diffusion_sim` and writes a
//! `metrics.json` report into it.

use clap::Parser;
use diffusion_core::checkpoint::SimulationReader;
use diffusion_core::{load_data, RunConfig};
use diffusion_metrics::{default_metrics_toml, MetricsConfig, MetricsReport};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Command line arguments for the evaluator
#[derive(Parser, Debug)]
#[command(name = "diffusion_metrics")]
#[command(about = "Computes metrics of a recorded diffusion run")]
struct Args {
    /// Run configuration the simulation was started with
    #[arg(long, required_unless_present = "print_default_config")]
    config: Option<PathBuf>,

    /// Checkpoint directory of the run (defaults to the configured output)
    #[arg(long)]
    run: Option<PathBuf>,

    /// Report path (defaults to the configured report file in the run directory)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also print the report to stdout
    #[arg(long)]
    print: bool,

    /// Prints the metrics section template and exits
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if args.print_default_config {
        print!("{}", default_metrics_toml());
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
    let run_config = RunConfig::from_file(&config_path)?;
    let metrics_config = MetricsConfig::from_run_file(&config_path)?;
    let run_dir = args.run.unwrap_or_else(|| run_config.output.dir.clone());

    let data = load_data(&run_config.data)?;
    let checkpoint = SimulationReader::new(&run_dir).read_checkpoint()?;
    let report = MetricsReport::compute(&data, &checkpoint, &metrics_config)?;

    let output = args
        .output
        .unwrap_or_else(|| run_dir.join(&metrics_config.report_file));
    report.write_json(&output)?;
    if args.print {
        println!("{}", report.to_json()?);
    }

    tracing::info!(
        "Coverage {:.3}, propagation gini {:.3}, reach gini {:.3}; report written to {:?}",
        report.coverage,
        report.user_propagation_gini,
        report.piece_reach_gini,
        output
    );
    if let Some(recall) = &report.recall {
        tracing::info!(
            "Ground truth: recall {:.3}, precision {:.3}, f1 {:.3}",
            recall.recall,
            recall.precision,
            recall.f1
        );
    }
    Ok(())
}
