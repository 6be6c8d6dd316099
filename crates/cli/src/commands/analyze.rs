use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use calib_analysis::{charts, loader, report};
use calib_shared::config::REPORT_FILE;
use calib_shared::AnalysisConfig;

use crate::output;

pub fn run(results_dir: &Path, output_dir: &Path, config: &AnalysisConfig) -> anyhow::Result<()> {
    if !results_dir.is_dir() {
        bail!("results directory {} does not exist", results_dir.display());
    }

    output::print_banner();
    println!("Loading calibration data from {}...", results_dir.display());

    let set = loader::load_result_set(results_dir)?;
    if set.is_empty() {
        bail!("no calibration data could be loaded from {}", results_dir.display());
    }
    println!("Loaded {} datasets", set.len());

    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    println!("Generating charts...");
    let charts = charts::render_all(&set, config, output_dir);

    println!("Generating report...");
    let report_path = output_dir.join(REPORT_FILE);
    report::write_report(&set, config, &report_path)?;

    output::print_results(output_dir, &charts, &report_path);
    Ok(())
}
