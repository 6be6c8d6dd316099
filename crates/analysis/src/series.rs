//! Plot-ready data for the three charts. Kept free of drawing code so the
//! selection rules can be tested without a backend.

use calib_shared::{AnalysisConfig, Observation, ResultSet, Table};

use crate::metrics::{self, OperatingPoint};

pub type Point = (f64, f64);

/// One curve of the comparison chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonSeries {
    pub failure_prob: f64,
    /// `(N, R_min)` for rows within the cap.
    pub valid: Vec<Point>,
    /// Workloads the simulator could not satisfy.
    pub failed: Vec<f64>,
}

pub fn comparison_series(set: &ResultSet, max_robots: u32) -> Vec<ComparisonSeries> {
    set.iter()
        .map(|(b, table)| {
            let (valid, failed): (Vec<&Observation>, Vec<&Observation>) =
                table.rows().iter().partition(|r| r.r_min <= max_robots);
            ComparisonSeries {
                failure_prob: b.into_inner(),
                valid: valid.iter().map(|r| (r.n as f64, r.r_min as f64)).collect(),
                failed: failed.iter().map(|r| r.n as f64).collect(),
            }
        })
        .filter(|s| !s.valid.is_empty() || !s.failed.is_empty())
        .collect()
}

/// Lowest `fraction` of the table's workload range.
pub fn low_load_zone(table: &Table, fraction: f64) -> Option<(f64, f64)> {
    let (lo, hi) = table.n_range()?;
    let lo = lo as f64;
    Some((lo, lo + (hi as f64 - lo) * fraction))
}

/// Data for the two cost-effectiveness panels, built from the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct CostSeries {
    pub r_min: Vec<Point>,
    /// Linear scaling through the first data point. Empty when that point
    /// has `N = 0`.
    pub ideal: Vec<Point>,
    /// `(N, lower, upper)` band between `R_min` and the over-provisioned count.
    pub band: Vec<(f64, f64, f64)>,
    pub efficiency: Vec<Point>,
    pub optimal: Option<OperatingPoint>,
}

pub fn cost_series(baseline: &Table, config: &AnalysisConfig) -> Option<CostSeries> {
    let first = baseline.rows().first()?;

    let r_min: Vec<Point> = baseline
        .rows()
        .iter()
        .map(|r| (r.n as f64, r.r_min as f64))
        .collect();

    let ideal = if first.n > 0 {
        let ratio = first.r_min as f64 / first.n as f64;
        r_min.iter().map(|&(n, _)| (n, n * ratio)).collect()
    } else {
        Vec::new()
    };

    let band = r_min
        .iter()
        .map(|&(n, r)| (n, r, r * config.overprovision_factor))
        .collect();

    let efficiency = metrics::valid_rows(baseline, config.max_robots)
        .filter_map(|r| metrics::efficiency(r).map(|e| (r.n as f64, e)))
        .collect();

    Some(CostSeries {
        r_min,
        ideal,
        band,
        efficiency,
        optimal: metrics::optimal_point(baseline, config.max_robots),
    })
}

/// `R_min` against failure probability for one sample workload. Entries are
/// `None` where the table has no row with exactly that `N`.
#[derive(Debug, Clone, PartialEq)]
pub struct RedundancyCurve {
    pub n: u32,
    pub points: Vec<(f64, Option<f64>)>,
}

impl RedundancyCurve {
    /// Contiguous runs of present points. A missing entry breaks the line
    /// instead of being interpolated.
    pub fn segments(&self) -> Vec<Vec<Point>> {
        let mut segments = Vec::new();
        let mut current = Vec::new();
        for &(b, r) in &self.points {
            match r {
                Some(r) => current.push((b, r)),
                None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
                None => {}
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }
}

pub fn redundancy_curves(set: &ResultSet, sample_workloads: &[u32]) -> Vec<RedundancyCurve> {
    sample_workloads
        .iter()
        .map(|&n| RedundancyCurve {
            n,
            points: set
                .iter()
                .map(|(b, table)| (b.into_inner(), table.find(n).map(|r| r.r_min as f64)))
                .collect(),
        })
        .filter(|c| c.points.iter().any(|(_, r)| r.is_some()))
        .collect()
}

/// Overhead curve of one non-zero failure probability.
#[derive(Debug, Clone, PartialEq)]
pub struct OverheadCurve {
    pub failure_prob: f64,
    pub points: Vec<Point>,
}

/// `None` when there is no baseline to compare against.
pub fn overhead_curves(set: &ResultSet) -> Option<Vec<OverheadCurve>> {
    let baseline = set.baseline()?;
    Some(
        set.iter()
            .filter(|(b, _)| b.into_inner() != 0.0)
            .map(|(b, table)| OverheadCurve {
                failure_prob: b.into_inner(),
                points: metrics::overhead_series(baseline, table)
                    .into_iter()
                    .map(|(n, pct)| (n as f64, pct))
                    .collect(),
            })
            .filter(|c| !c.points.is_empty())
            .collect(),
    )
}

/// Axis range covering `values`, widened when degenerate.
pub fn padded_range(values: impl IntoIterator<Item = f64>, pad_fraction: f64) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    let span = hi - lo;
    if span <= f64::EPSILON {
        let pad = lo.abs().max(1.0) * 0.5;
        return Some((lo - pad, hi + pad));
    }
    let pad = span * pad_fraction;
    Some((lo - pad, hi + pad))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(u32, u32)]) -> Table {
        Table::new(
            rows.iter()
                .map(|&(n, r)| Observation::new(n, r, 1.0))
                .collect(),
        )
        .unwrap()
    }

    fn sample_set() -> ResultSet {
        let mut set = ResultSet::new();
        set.insert(0.0, table(&[(10, 2), (20, 3), (30, 5), (40, 21)]));
        set.insert(0.05, table(&[(10, 2), (20, 4), (30, 6), (40, 21)]));
        set.insert(0.1, table(&[(10, 3), (30, 7)]));
        set
    }

    #[test]
    fn test_comparison_excludes_rows_above_cap() {
        let series = comparison_series(&sample_set(), 20);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].failure_prob, 0.0);
        assert_eq!(series[0].valid, vec![(10.0, 2.0), (20.0, 3.0), (30.0, 5.0)]);
        assert_eq!(series[0].failed, vec![40.0]);
        assert!(series[2].failed.is_empty());
    }

    #[test]
    fn test_low_load_zone_covers_lowest_fraction() {
        let zone = low_load_zone(&table(&[(10, 2), (60, 9)]), 0.3).unwrap();
        assert_eq!(zone, (10.0, 25.0));
        assert_eq!(low_load_zone(&Table::default(), 0.3), None);
    }

    #[test]
    fn test_cost_series_from_baseline() {
        let set = sample_set();
        let cost = cost_series(set.baseline().unwrap(), &AnalysisConfig::default()).unwrap();
        assert_eq!(cost.ideal[3], (40.0, 8.0));
        assert_eq!(cost.band[1], (20.0, 3.0, 3.0 * 1.2));
        assert_eq!(cost.efficiency.len(), 3);
        let best = cost.optimal.unwrap();
        assert_eq!((best.n, best.r_min), (20, 3));
    }

    #[test]
    fn test_cost_series_without_anchor() {
        let cost = cost_series(&table(&[(0, 1), (10, 2)]), &AnalysisConfig::default()).unwrap();
        assert!(cost.ideal.is_empty());
        assert!(cost_series(&Table::default(), &AnalysisConfig::default()).is_none());
    }

    #[test]
    fn test_redundancy_curves_leave_gaps() {
        let curves = redundancy_curves(&sample_set(), &[10, 20, 55]);
        assert_eq!(curves.len(), 2);

        let n20 = &curves[1];
        assert_eq!(n20.n, 20);
        assert_eq!(
            n20.points,
            vec![(0.0, Some(3.0)), (0.05, Some(4.0)), (0.1, None)]
        );
        assert_eq!(n20.segments(), vec![vec![(0.0, 3.0), (0.05, 4.0)]]);
    }

    #[test]
    fn test_segments_split_on_missing_point() {
        let curve = RedundancyCurve {
            n: 30,
            points: vec![(0.0, Some(5.0)), (0.01, None), (0.05, Some(6.0))],
        };
        assert_eq!(curve.segments(), vec![vec![(0.0, 5.0)], vec![(0.05, 6.0)]]);
    }

    #[test]
    fn test_overhead_curves_skip_baseline() {
        let curves = overhead_curves(&sample_set()).unwrap();
        let probs: Vec<f64> = curves.iter().map(|c| c.failure_prob).collect();
        assert_eq!(probs, vec![0.05, 0.1]);
        assert!((curves[0].points[1].1 - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(curves[0].points[3], (40.0, 0.0));
    }

    #[test]
    fn test_overhead_curves_need_baseline() {
        let mut set = ResultSet::new();
        set.insert(0.05, table(&[(10, 2)]));
        assert!(overhead_curves(&set).is_none());
    }

    #[test]
    fn test_padded_range() {
        assert_eq!(padded_range([1.0, 3.0], 0.5), Some((0.0, 4.0)));
        assert_eq!(padded_range([2.0], 0.1), Some((1.0, 3.0)));
        assert_eq!(padded_range(std::iter::empty::<f64>(), 0.1), None);
    }
}
