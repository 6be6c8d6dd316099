use std::fmt::{self, Write as _};
use std::fs;
use std::path::Path;

use anyhow::Context;
use calib_shared::{AnalysisConfig, ResultSet, Table};
use tracing::{info, warn};

use crate::metrics;

const RULE_WIDTH: usize = 70;

/// Writes the text report to `path`, replacing any previous one.
pub fn write_report(set: &ResultSet, config: &AnalysisConfig, path: &Path) -> anyhow::Result<()> {
    let text = render_report(set, config);
    fs::write(path, text).with_context(|| format!("writing report {}", path.display()))?;
    info!(path = %path.display(), "report saved");
    Ok(())
}

/// Builds the report text. Output depends only on the inputs, so identical
/// data always yields identical bytes.
pub fn render_report(set: &ResultSet, config: &AnalysisConfig) -> String {
    let mut out = String::new();
    write_report_text(&mut out, set, config).expect("writing to a String");
    out
}

fn write_report_text(out: &mut String, set: &ResultSet, config: &AnalysisConfig) -> fmt::Result {
    let rule = "=".repeat(RULE_WIDTH);

    writeln!(out, "{rule}")?;
    writeln!(out, " Robot Calibration Analysis Report")?;
    writeln!(out, "{rule}")?;
    writeln!(out)?;

    for (b, table) in set {
        write_table_summary(out, b.into_inner(), table, config)?;
    }

    writeln!(out)?;
    writeln!(out, "{rule}")?;
    writeln!(out, " RECOMMENDATIONS")?;
    writeln!(out, "{rule}")?;

    write_optimal_section(out, set, config)?;
    write_redundancy_section(out, set, config)?;

    writeln!(out)?;
    writeln!(out, "3. SCALABILITY:")?;
    writeln!(out, "   - Required robots grow roughly linearly with N")?;
    writeln!(
        out,
        "   - For loads of 1.2x N, plan a proportional increase in robots"
    )?;

    writeln!(out)?;
    writeln!(out, "{rule}")
}

fn write_table_summary(
    out: &mut String,
    failure_prob: f64,
    table: &Table,
    config: &AnalysisConfig,
) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "--- Failure probability B = {failure_prob:.3} ---")?;

    if let (Some((n_lo, n_hi)), Some((r_lo, r_hi))) = (table.n_range(), table.r_min_range()) {
        writeln!(out, "  Workload range (N):  {n_lo} - {n_hi}")?;
        writeln!(out, "  Minimum robots:      {r_lo}")?;
        writeln!(out, "  Maximum robots:      {r_hi}")?;
    } else {
        writeln!(out, "  (no observations)")?;
    }

    if let Some(means) = metrics::valid_means(table, config.max_robots) {
        writeln!(
            out,
            "  Mean efficiency:     {:.2} items/robot",
            means.efficiency
        )?;
        writeln!(
            out,
            "  Mean success rate:   {:.1}%",
            means.success_rate * 100.0
        )?;
    }
    Ok(())
}

fn write_optimal_section(
    out: &mut String,
    set: &ResultSet,
    config: &AnalysisConfig,
) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "1. OPTIMAL OPERATING POINT (no failures):")?;

    let best = set
        .baseline()
        .and_then(|baseline| metrics::optimal_point(baseline, config.max_robots));
    match best {
        Some(best) => {
            writeln!(
                out,
                "   - Configuration: N={} items, R={} robots",
                best.n, best.r_min
            )?;
            writeln!(out, "   - Efficiency: {:.2} items/robot", best.efficiency)?;
            writeln!(out, "   - This configuration maximizes resource utilization")?;
        }
        None => {
            warn!("no valid baseline rows, optimal operating point omitted");
            writeln!(out, "   - Not available (no valid zero-failure data)")?;
        }
    }
    Ok(())
}

fn write_redundancy_section(
    out: &mut String,
    set: &ResultSet,
    config: &AnalysisConfig,
) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "2. REDUNDANCY IMPACT:")?;

    let n = config.report_workload;
    let b = config.report_failure_prob;
    let pair = set
        .baseline()
        .and_then(|t| t.find(n))
        .zip(set.get(b).and_then(|t| t.find(n)));
    let example = pair.and_then(|(base, faulty)| {
        metrics::overhead(faulty.r_min, base.r_min).map(|pct| (base.r_min, faulty.r_min, pct))
    });

    match example {
        Some((r_base, r_faulty, pct)) => {
            writeln!(out, "   - With B={b:.3}, {pct:.1}% more robots are required")?;
            writeln!(
                out,
                "   - Example: N={n} items requires {r_base} robots (B=0) vs {r_faulty} robots (B={b:.3})"
            )?;
        }
        None => {
            warn!(n, failure_prob = b, "no matching rows, redundancy example omitted");
            writeln!(
                out,
                "   - Not available (no N={n} rows for both B=0 and B={b:.3})"
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calib_shared::Observation;

    fn table(rows: &[(u32, u32, f64)]) -> Table {
        Table::new(
            rows.iter()
                .map(|&(n, r, s)| Observation::new(n, r, s))
                .collect(),
        )
        .unwrap()
    }

    fn sample_set() -> ResultSet {
        let mut set = ResultSet::new();
        set.insert(0.05, table(&[(10, 2, 1.0), (20, 4, 0.97), (30, 6, 0.96)]));
        set.insert(0.0, table(&[(10, 2, 1.0), (20, 3, 0.99), (30, 5, 0.98), (40, 21, 0.0)]));
        set
    }

    #[test]
    fn test_report_contains_recommendations() {
        let text = render_report(&sample_set(), &AnalysisConfig::default());

        assert!(text.contains("Configuration: N=20 items, R=3 robots"));
        assert!(text.contains("Efficiency: 6.67 items/robot"));
        assert!(text.contains("With B=0.050, 20.0% more robots are required"));
        assert!(text.contains("N=30 items requires 5 robots (B=0) vs 6 robots (B=0.050)"));
    }

    #[test]
    fn test_tables_in_ascending_order() {
        let text = render_report(&sample_set(), &AnalysisConfig::default());
        let zero = text.find("B = 0.000").unwrap();
        let five = text.find("B = 0.050").unwrap();
        assert!(zero < five);
    }

    #[test]
    fn test_summary_uses_valid_rows_for_means() {
        let text = render_report(&sample_set(), &AnalysisConfig::default());
        let block: &str = text
            .split("--- Failure probability B = 0.000 ---")
            .nth(1)
            .unwrap();
        assert!(block.contains("Workload range (N):  10 - 40"));
        assert!(block.contains("Maximum robots:      21"));
        // (5 + 6.67 + 6) / 3 over the three valid rows
        assert!(block.contains("Mean efficiency:     5.89 items/robot"));
        assert!(block.contains("Mean success rate:   99.0%"));
    }

    #[test]
    fn test_empty_set_keeps_headings_without_figures() {
        let text = render_report(&ResultSet::new(), &AnalysisConfig::default());
        assert!(text.contains("RECOMMENDATIONS"));
        assert!(text.contains("1. OPTIMAL OPERATING POINT"));
        assert!(text.contains("2. REDUNDANCY IMPACT"));
        assert!(text.contains("3. SCALABILITY"));
        assert!(!text.contains("Configuration:"));
        assert!(!text.contains("more robots are required"));
        assert!(!text.contains("Failure probability B ="));
    }

    #[test]
    fn test_missing_comparison_table_degrades_section() {
        let mut set = ResultSet::new();
        set.insert(0.0, table(&[(30, 5, 1.0)]));
        let text = render_report(&set, &AnalysisConfig::default());
        assert!(text.contains("Configuration: N=30 items, R=5 robots"));
        assert!(text.contains("2. REDUNDANCY IMPACT:\n   - Not available"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let config = AnalysisConfig::default();
        assert_eq!(
            render_report(&sample_set(), &config),
            render_report(&sample_set(), &config)
        );
    }

    #[test]
    fn test_write_report_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis_report.txt");
        fs::write(&path, "stale").unwrap();
        write_report(&ResultSet::new(), &AnalysisConfig::default(), &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(&"=".repeat(RULE_WIDTH)));
        assert!(!text.contains("stale"));
    }
}
