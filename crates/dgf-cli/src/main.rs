//! Demo driver: runs a built-in case and writes checkpoints and view frames.

mod cases;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dgf_solver::OutputConfig;

#[derive(Parser)]
#[command(name = "dgf", about = "High-order DG flow solver demo driver")]
struct Cli {
    /// Suppress progress output.
    #[arg(long, global = true)]
    quiet: bool,

    /// Worker thread count (defaults to the physical cores minus one).
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the built-in cases.
    Cases,
    /// Run a built-in case.
    Run {
        /// Case name (see `dgf cases`).
        case: String,
        /// Output directory for raw/ checkpoints and vtu/ frames.
        #[arg(long, default_value = "out")]
        output: PathBuf,
        /// Filename prefix; defaults to the case name.
        #[arg(long)]
        prefix: Option<String>,
        /// Override the iteration count.
        #[arg(long)]
        iterations: Option<usize>,
        /// Checkpoint every N iterations (0 disables).
        #[arg(long, default_value_t = 500)]
        io_interval: usize,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let filter = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    let threads = cli.threads.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1).max(1))
            .unwrap_or(1)
    });
    if let Err(error) = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
        error!(%error, "failed to size the worker pool");
        return ExitCode::FAILURE;
    }

    match cli.command {
        Command::Cases => {
            for name in cases::available() {
                println!("{name}");
            }
            ExitCode::SUCCESS
        }
        Command::Run { case, output, prefix, iterations, io_interval } => {
            if !cases::available().contains(&case.as_str()) {
                error!(case, "unknown case; run `dgf cases` for the list");
                return ExitCode::FAILURE;
            }
            let mut case = match cases::build(&case, iterations, io_interval) {
                Ok(case) => case,
                Err(error) => {
                    error!(%error, "case setup failed");
                    return ExitCode::FAILURE;
                }
            };
            let output = OutputConfig {
                directory: output,
                prefix: prefix.unwrap_or_else(|| case.name.to_string()),
            };
            info!(case = case.name, threads, "starting run");
            let report = match case.solver.solve(&case.mesh, &case.time, Some(&output)) {
                Ok(report) => report,
                Err(error) => {
                    error!(%error, "run failed");
                    return ExitCode::FAILURE;
                }
            };
            info!(
                iterations = report.iterations,
                delta_time = report.delta_time,
                "run complete"
            );
            if let Err(error) = case.solver.write_view(
                &case.mesh,
                &case.view_variables,
                &output,
                case.time.iteration_end,
            ) {
                error!(%error, "view output failed");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
    }
}
