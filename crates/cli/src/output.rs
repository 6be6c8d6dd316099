use std::path::Path;

use calib_analysis::charts::ChartOutcome;

pub fn print_banner() {
    println!("\n========================================");
    println!("  Calibration Results Analysis");
    println!("========================================\n");
}

pub fn print_results(output_dir: &Path, charts: &[(&str, ChartOutcome)], report_path: &Path) {
    println!("\n========================================");
    println!("  Analysis complete");
    println!("========================================");
    println!("\nOutput directory: {}", output_dir.display());
    for (file, outcome) in charts {
        match outcome {
            ChartOutcome::Written(_) => println!("  - {file}"),
            ChartOutcome::Skipped(reason) => println!("  - {file} (skipped: {reason})"),
        }
    }
    if let Some(name) = report_path.file_name() {
        println!("  - {}", name.to_string_lossy());
    }
    println!();
}
