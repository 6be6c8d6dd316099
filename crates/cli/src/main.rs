mod commands;
mod output;

use std::io;
use std::path::PathBuf;

use calib_shared::AnalysisConfig;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Charts and a summary report from robot calibration results
#[derive(Parser)]
#[command(name = "calib-report", version, about)]
struct Cli {
    /// Directory holding the r_vs_n_B<value>.csv files
    results_dir: PathBuf,
    /// Where to write charts and the report (defaults to the results directory)
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Largest robot count the calibration searched
    #[arg(long, default_value_t = calib_shared::config::MAX_ROBOTS)]
    max_robots: u32,
    /// Log per-row detail
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(1);
        }
        // --help and --version
        Err(e) => e.exit(),
    };

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = AnalysisConfig::default().with_max_robots(cli.max_robots);
    let output_dir = cli.output_dir.as_deref().unwrap_or(&cli.results_dir);

    commands::analyze::run(&cli.results_dir, output_dir, &config)
}
