use calib_shared::{Observation, Table};

/// Best workload/robot pairing of one table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingPoint {
    pub n: u32,
    pub r_min: u32,
    pub efficiency: f64,
}

/// Items served per robot. `None` when `r_min` is zero.
pub fn efficiency(row: &Observation) -> Option<f64> {
    (row.r_min > 0).then(|| row.n as f64 / row.r_min as f64)
}

/// Percentage of extra robots needed relative to the baseline count.
pub fn overhead(r_with_b: u32, r_baseline: u32) -> Option<f64> {
    if r_baseline == 0 {
        return None;
    }
    let base = r_baseline as f64;
    Some((r_with_b as f64 - base) / base * 100.0)
}

/// Overhead of `table` against `baseline` for every workload present in
/// both. Workloads missing from the baseline are skipped.
pub fn overhead_series(baseline: &Table, table: &Table) -> Vec<(u32, f64)> {
    table
        .rows()
        .iter()
        .filter_map(|row| {
            let base = baseline.find(row.n)?;
            overhead(row.r_min, base.r_min).map(|pct| (row.n, pct))
        })
        .collect()
}

/// Rows whose robot count lies within `max_robots`.
pub fn valid_rows(table: &Table, max_robots: u32) -> impl Iterator<Item = &Observation> {
    table.rows().iter().filter(move |r| r.r_min <= max_robots)
}

/// The valid row with the highest efficiency; the first one wins ties.
pub fn optimal_point(table: &Table, max_robots: u32) -> Option<OperatingPoint> {
    let mut best: Option<OperatingPoint> = None;
    for row in valid_rows(table, max_robots) {
        let Some(eff) = efficiency(row) else {
            continue;
        };
        if best.map_or(true, |b| eff > b.efficiency) {
            best = Some(OperatingPoint {
                n: row.n,
                r_min: row.r_min,
                efficiency: eff,
            });
        }
    }
    best
}

/// Means taken over the valid rows of a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidMeans {
    pub efficiency: f64,
    pub success_rate: f64,
}

pub fn valid_means(table: &Table, max_robots: u32) -> Option<ValidMeans> {
    let valid: Vec<&Observation> = valid_rows(table, max_robots)
        .filter(|r| r.r_min > 0)
        .collect();
    if valid.is_empty() {
        return None;
    }
    let count = valid.len() as f64;
    let efficiency = valid.iter().filter_map(|r| efficiency(r)).sum::<f64>() / count;
    let success_rate = valid.iter().map(|r| r.success_rate).sum::<f64>() / count;
    Some(ValidMeans {
        efficiency,
        success_rate,
    })
}
