//! Merton CLI binary.
//!
//! Runs the distance-to-default engine over a panel file and writes one
//! result table per method plus a run summary.

mod pipeline;

use clap::{Parser, Subcommand, ValueEnum};
use merton_model::Method;
use pipeline::config::{LagKind, RunConfig};
use pipeline::run::{RunRequest, inspect, run_batch};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "merton")]
#[command(about = "Merton distance-to-default and default-probability estimation", long_about = None)]
#[command(version)]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MethodArg {
    Simultaneous,
    Iterated,
    Both,
}

impl MethodArg {
    fn methods(self) -> Vec<Method> {
        match self {
            Self::Simultaneous => vec![Method::Simultaneous],
            Self::Iterated => vec![Method::Iterated],
            Self::Both => Method::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LagArg {
    TradingDays,
    CalendarDays,
}

impl From<LagArg> for LagKind {
    fn from(arg: LagArg) -> Self {
        match arg {
            LagArg::TradingDays => Self::TradingDays,
            LagArg::CalendarDays => Self::CalendarDays,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate DD and PD for every firm and month end
    Run {
        /// Pipe-separated daily panel
        #[arg(long)]
        panel: PathBuf,

        /// Trading calendar file (one date per line under a `date` header)
        #[arg(long, required_unless_present = "derive_calendar")]
        calendar: Option<PathBuf>,

        /// Directory for result tables and the run summary
        #[arg(long)]
        output_dir: PathBuf,

        /// Solution method
        #[arg(long, value_enum, default_value = "both")]
        method: MethodArg,

        /// Worker threads (0 = available parallelism)
        #[arg(long)]
        threads: Option<usize>,

        /// JSON file with `model` and `engine` settings
        #[arg(long)]
        config: Option<PathBuf>,

        /// How the look-back lag date is found
        #[arg(long, value_enum)]
        lag_convention: Option<LagArg>,

        /// Look-back length in units of the lag convention
        #[arg(long)]
        lag_days: Option<i64>,

        /// Build the trading calendar from the panel's dates
        #[arg(long)]
        derive_calendar: bool,

        /// Write `iteration_time` as NaN so repeated runs give identical files
        #[arg(long)]
        no_timings: bool,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Print panel load statistics
    Inspect {
        /// Pipe-separated daily panel
        #[arg(long)]
        panel: PathBuf,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    pipeline::logging::init(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Run {
            panel,
            calendar,
            output_dir,
            method,
            threads,
            config,
            lag_convention,
            lag_days,
            derive_calendar,
            no_timings,
            no_progress,
        } => {
            let config = RunConfig::load(config.as_deref())?.with_overrides(
                threads,
                lag_convention.map(LagKind::from),
                lag_days,
            );
            let summary = run_batch(RunRequest {
                panel,
                calendar,
                derive_calendar,
                output_dir,
                methods: method.methods(),
                config,
                timings: !no_timings,
                progress: !no_progress,
            })?;
            for method in &summary.methods {
                println!("{}", method);
            }
        }
        Commands::Inspect { panel } => {
            inspect(&panel)?;
        }
    }

    Ok(())
}
