use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use calib_shared::config::{COMPARISON_CHART_FILE, COST_CHART_FILE, REDUNDANCY_CHART_FILE};
use calib_shared::{AnalysisConfig, ResultSet};
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::{debug, info, warn};

use crate::series::{
    self, ComparisonSeries, CostSeries, OverheadCurve, Point, RedundancyCurve,
};

const COMPARISON_SIZE: (u32, u32) = (1200, 700);
const PANEL_PAIR_SIZE: (u32, u32) = (1400, 600);

const PALETTE: [RGBColor; 6] = [
    RGBColor(46, 134, 171),
    RGBColor(162, 59, 114),
    RGBColor(241, 143, 1),
    RGBColor(199, 62, 29),
    RGBColor(59, 31, 43),
    RGBColor(106, 153, 78),
];

type Chart2d<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    Written(PathBuf),
    Skipped(String),
}

impl fmt::Display for ChartOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartOutcome::Written(path) => write!(f, "written to {}", path.display()),
            ChartOutcome::Skipped(reason) => write!(f, "skipped ({reason})"),
        }
    }
}

/// Renders the three charts into `out_dir`. A chart that cannot be drawn is
/// reported as skipped so the remaining outputs are still produced.
pub fn render_all(
    set: &ResultSet,
    config: &AnalysisConfig,
    out_dir: &Path,
) -> Vec<(&'static str, ChartOutcome)> {
    type RenderFn = fn(&ResultSet, &AnalysisConfig, &Path) -> anyhow::Result<ChartOutcome>;
    let charts: [(&'static str, RenderFn); 3] = [
        (COMPARISON_CHART_FILE, render_comparison),
        (COST_CHART_FILE, render_cost_effectiveness),
        (REDUNDANCY_CHART_FILE, render_redundancy),
    ];

    charts
        .into_iter()
        .map(|(file, render)| {
            let path = out_dir.join(file);
            let outcome = match render(set, config, &path) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(file, "chart rendering failed: {e:#}");
                    ChartOutcome::Skipped(format!("rendering failed: {e}"))
                }
            };
            match &outcome {
                ChartOutcome::Written(path) => info!(path = %path.display(), "chart saved"),
                ChartOutcome::Skipped(reason) => {
                    warn!(file, "chart skipped: {reason}");
                    remove_stale(&path);
                }
            }
            (file, outcome)
        })
        .collect()
}

/// A skipped chart must not leave a half-drawn image or an older run's image
/// behind.
fn remove_stale(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed stale chart"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), "could not remove stale chart: {e}"),
    }
}

pub fn render_comparison(
    set: &ResultSet,
    config: &AnalysisConfig,
    path: &Path,
) -> anyhow::Result<ChartOutcome> {
    let series = series::comparison_series(set, config.max_robots);
    if series.is_empty() {
        return Ok(ChartOutcome::Skipped("no plottable series".into()));
    }

    let zone = match set.baseline() {
        Some(baseline) => series::low_load_zone(baseline, config.low_load_fraction),
        None => {
            warn!("no baseline (B = 0) table, low-load zone omitted");
            None
        }
    };

    let root = BitMapBackend::new(path, COMPARISON_SIZE).into_drawing_area();
    draw_comparison(&root, &series, zone, config.max_robots)?;
    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(ChartOutcome::Written(path.to_path_buf()))
}

pub fn render_cost_effectiveness(
    set: &ResultSet,
    config: &AnalysisConfig,
    path: &Path,
) -> anyhow::Result<ChartOutcome> {
    let Some(baseline) = set.baseline() else {
        return Ok(ChartOutcome::Skipped("no baseline (B = 0) table".into()));
    };
    let Some(cost) = series::cost_series(baseline, config) else {
        return Ok(ChartOutcome::Skipped("baseline table is empty".into()));
    };

    let root = BitMapBackend::new(path, PANEL_PAIR_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, 2));
    draw_cost_panel(&panels[0], &cost)?;
    draw_efficiency_panel(&panels[1], &cost)?;
    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(ChartOutcome::Written(path.to_path_buf()))
}

pub fn render_redundancy(
    set: &ResultSet,
    config: &AnalysisConfig,
    path: &Path,
) -> anyhow::Result<ChartOutcome> {
    let curves = series::redundancy_curves(set, &config.sample_workloads);
    let overhead = series::overhead_curves(set);
    if overhead.is_none() {
        warn!("no baseline (B = 0) table, overhead panel left empty");
    }
    let overhead = overhead.unwrap_or_default();

    if curves.is_empty() && overhead.is_empty() {
        return Ok(ChartOutcome::Skipped("no plottable series".into()));
    }

    let root = BitMapBackend::new(path, PANEL_PAIR_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, 2));
    draw_redundancy_panel(&panels[0], &curves)?;
    draw_overhead_panel(&panels[1], &overhead)?;
    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(ChartOutcome::Written(path.to_path_buf()))
}

fn draw_comparison<DB>(
    area: &DrawingArea<DB, Shift>,
    series: &[ComparisonSeries],
    zone: Option<(f64, f64)>,
    max_robots: u32,
) -> anyhow::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    area.fill(&WHITE)?;

    let xs = series
        .iter()
        .flat_map(|s| s.valid.iter().map(|p| p.0).chain(s.failed.iter().copied()));
    let (x_lo, x_hi) = series::padded_range(xs, 0.03).unwrap_or((0.0, 1.0));
    let y_hi = max_robots as f64 + 1.0;

    let mut chart = ChartBuilder::on(area)
        .caption(
            "Minimum robots vs workload by failure probability",
            ("sans-serif", 26),
        )
        .margin(25)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(x_lo..x_hi, 0.0..y_hi)?;

    chart
        .configure_mesh()
        .x_desc("Workload (N)")
        .y_desc("Minimum robots required (R)")
        .light_line_style(BLACK.mix(0.05))
        .draw()?;

    if let Some((lo, hi)) = zone {
        let style = GREEN.mix(0.1).filled();
        chart
            .draw_series(std::iter::once(Rectangle::new([(lo, 0.0), (hi, y_hi)], style)))?
            .label("Low-load zone")
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], style));
    }

    for (idx, s) in series.iter().enumerate() {
        let color = PALETTE[idx % 4];
        if !s.valid.is_empty() {
            chart
                .draw_series(LineSeries::new(s.valid.iter().copied(), color.stroke_width(2)))?
                .label(format!("B = {:.3}", s.failure_prob))
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
            draw_markers(&mut chart, &s.valid, idx, color)?;
        }
        // Unsatisfied workloads sit on the cap.
        chart.draw_series(
            s.failed
                .iter()
                .map(|&n| Cross::new((n, max_robots as f64), 6, color.mix(0.5).stroke_width(2))),
        )?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.9))
        .border_style(BLACK.mix(0.3))
        .draw()?;
    Ok(())
}

fn draw_cost_panel<DB>(area: &DrawingArea<DB, Shift>, cost: &CostSeries) -> anyhow::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (x_lo, x_hi) =
        series::padded_range(cost.r_min.iter().map(|p| p.0), 0.03).unwrap_or((0.0, 1.0));
    let y_max = cost
        .band
        .iter()
        .map(|b| b.2)
        .chain(cost.ideal.iter().map(|p| p.1))
        .fold(1.0, f64::max);

    let mut chart = ChartBuilder::on(area)
        .caption("Cost-effective operating point", ("sans-serif", 22))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_lo..x_hi, 0.0..y_max * 1.1)?;

    chart
        .configure_mesh()
        .x_desc("Workload (N)")
        .y_desc("Robots required (R)")
        .light_line_style(BLACK.mix(0.05))
        .draw()?;

    let band_style = GREEN.mix(0.2).filled();
    let outline: Vec<Point> = cost
        .band
        .iter()
        .map(|&(n, _, hi)| (n, hi))
        .chain(cost.band.iter().rev().map(|&(n, lo, _)| (n, lo)))
        .collect();
    chart
        .draw_series(std::iter::once(Polygon::new(outline, band_style)))?
        .label("Over-provisioned zone (+20%)")
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], band_style));

    let color = PALETTE[0];
    chart
        .draw_series(LineSeries::new(cost.r_min.iter().copied(), color.stroke_width(2)))?
        .label("Minimum R")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    draw_markers(&mut chart, &cost.r_min, 0, color)?;

    if !cost.ideal.is_empty() {
        let ideal_style = BLACK.mix(0.4).stroke_width(1);
        chart
            .draw_series(LineSeries::new(cost.ideal.iter().copied(), ideal_style))?
            .label("Ideal linear scaling")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], ideal_style));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.9))
        .border_style(BLACK.mix(0.3))
        .draw()?;
    Ok(())
}

fn draw_efficiency_panel<DB>(area: &DrawingArea<DB, Shift>, cost: &CostSeries) -> anyhow::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (x_lo, x_hi) =
        series::padded_range(cost.r_min.iter().map(|p| p.0), 0.03).unwrap_or((0.0, 1.0));
    let y_max = cost.efficiency.iter().map(|p| p.1).fold(1.0, f64::max) * 1.15;

    let mut chart = ChartBuilder::on(area)
        .caption("Robot utilization", ("sans-serif", 22))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_lo..x_hi, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Workload (N)")
        .y_desc("Efficiency (items / robot)")
        .light_line_style(BLACK.mix(0.05))
        .draw()?;

    let color = PALETTE[2];
    chart.draw_series(LineSeries::new(
        cost.efficiency.iter().copied(),
        color.stroke_width(2),
    ))?;
    draw_markers(&mut chart, &cost.efficiency, 2, color)?;

    if let Some(best) = cost.optimal {
        let x = best.n as f64;
        chart.draw_series(LineSeries::new(
            vec![(x, 0.0), (x, y_max)],
            RED.mix(0.5).stroke_width(1),
        ))?;
        let label_style = ("sans-serif", 16)
            .into_font()
            .style(FontStyle::Bold)
            .color(&RED)
            .pos(Pos::new(HPos::Center, VPos::Bottom));
        chart.draw_series(std::iter::once(Text::new(
            format!("Optimal: N={}, R={}", best.n, best.r_min),
            (x, best.efficiency * 1.05),
            label_style,
        )))?;
    }
    Ok(())
}

fn draw_redundancy_panel<DB>(
    area: &DrawingArea<DB, Shift>,
    curves: &[RedundancyCurve],
) -> anyhow::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (x_lo, x_hi) = series::padded_range(
        curves.iter().flat_map(|c| c.points.iter().map(|p| p.0)),
        0.05,
    )
    .unwrap_or((0.0, 1.0));
    let y_max = curves
        .iter()
        .flat_map(|c| c.points.iter().filter_map(|p| p.1))
        .fold(1.0, f64::max);

    let mut chart = ChartBuilder::on(area)
        .caption("Failure impact on robot requirement", ("sans-serif", 22))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_lo..x_hi, 0.0..y_max * 1.15)?;

    chart
        .configure_mesh()
        .x_desc("Failure probability (B)")
        .y_desc("Robots required (R)")
        .x_label_formatter(&|v| format!("{v:.2}"))
        .light_line_style(BLACK.mix(0.05))
        .draw()?;

    for (idx, curve) in curves.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        for (seg_idx, segment) in curve.segments().into_iter().enumerate() {
            let anno = chart.draw_series(LineSeries::new(segment.iter().copied(), color.stroke_width(2)))?;
            if seg_idx == 0 {
                anno.label(format!("N={}", curve.n)).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
            }
            chart.draw_series(segment.iter().map(|&p| Circle::new(p, 4, color.filled())))?;
        }
    }

    if !curves.is_empty() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.9))
            .border_style(BLACK.mix(0.3))
            .draw()?;
    }
    Ok(())
}

fn draw_overhead_panel<DB>(
    area: &DrawingArea<DB, Shift>,
    curves: &[OverheadCurve],
) -> anyhow::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (x_lo, x_hi) = series::padded_range(
        curves.iter().flat_map(|c| c.points.iter().map(|p| p.0)),
        0.03,
    )
    .unwrap_or((0.0, 1.0));
    let ys = curves
        .iter()
        .flat_map(|c| c.points.iter().map(|p| p.1))
        .chain([0.0]);
    let (y_lo, y_hi) = series::padded_range(ys, 0.1).unwrap_or((-1.0, 1.0));

    let mut chart = ChartBuilder::on(area)
        .caption("Cost of fault tolerance", ("sans-serif", 22))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_desc("Workload (N)")
        .y_desc("Redundancy overhead (%)")
        .light_line_style(BLACK.mix(0.05))
        .draw()?;

    chart.draw_series(LineSeries::new(
        vec![(x_lo, 0.0), (x_hi, 0.0)],
        BLACK.stroke_width(1),
    ))?;

    // Index 0 is the baseline colour on the comparison chart.
    for (idx, curve) in curves.iter().enumerate() {
        let color = PALETTE[(idx + 1) % 4];
        chart
            .draw_series(LineSeries::new(curve.points.iter().copied(), color.stroke_width(2)))?
            .label(format!("B={:.3}", curve.failure_prob))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart.draw_series(curve.points.iter().map(|&p| Circle::new(p, 4, color.filled())))?;
    }

    if !curves.is_empty() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.9))
            .border_style(BLACK.mix(0.3))
            .draw()?;
    }
    Ok(())
}

/// Point markers, shape chosen by series index.
fn draw_markers<DB>(
    chart: &mut Chart2d<'_, DB>,
    points: &[Point],
    idx: usize,
    color: RGBColor,
) -> anyhow::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let style = color.filled();
    match idx % 3 {
        0 => {
            chart.draw_series(points.iter().map(|&p| Circle::new(p, 4, style)))?;
        }
        1 => {
            chart.draw_series(points.iter().map(|&p| TriangleMarker::new(p, 5, style)))?;
        }
        _ => {
            chart.draw_series(
                points
                    .iter()
                    .map(|&p| EmptyElement::at(p) + Rectangle::new([(-4, -4), (4, 4)], style)),
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calib_shared::{Observation, Table};

    #[test]
    fn test_empty_set_skips_every_chart() {
        let dir = tempfile::tempdir().unwrap();
        let outcomes = render_all(&ResultSet::new(), &AnalysisConfig::default(), dir.path());
        assert_eq!(outcomes.len(), 3);
        for (file, outcome) in &outcomes {
            assert!(matches!(outcome, ChartOutcome::Skipped(_)), "{file}: {outcome}");
            assert!(!dir.path().join(file).exists());
        }
    }

    fn table(rows: &[(u32, u32)]) -> Table {
        Table::new(
            rows.iter()
                .map(|&(n, r)| Observation::new(n, r, 1.0))
                .collect(),
        )
        .unwrap()
    }

    fn two_table_set() -> ResultSet {
        let mut set = ResultSet::new();
        set.insert(0.0, table(&[(10, 2), (20, 3), (30, 5), (40, 21)]));
        set.insert(0.05, table(&[(10, 2), (20, 4), (30, 6), (40, 21)]));
        set
    }

    #[test]
    fn test_populated_set_writes_every_chart() {
        let dir = tempfile::tempdir().unwrap();
        let outcomes = render_all(&two_table_set(), &AnalysisConfig::default(), dir.path());
        assert_eq!(outcomes.len(), 3);
        for (file, outcome) in &outcomes {
            let path = dir.path().join(file);
            assert_eq!(outcome, &ChartOutcome::Written(path.clone()));
            assert!(fs::metadata(&path).unwrap().len() > 0, "{file} is empty");
        }
    }

    #[test]
    fn test_without_baseline_only_cost_chart_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = ResultSet::new();
        set.insert(0.05, table(&[(10, 2), (20, 4), (30, 6)]));
        set.insert(0.1, table(&[(10, 3), (30, 7)]));

        let outcomes = render_all(&set, &AnalysisConfig::default(), dir.path());
        for (file, outcome) in &outcomes {
            let path = dir.path().join(file);
            if *file == COST_CHART_FILE {
                assert!(matches!(outcome, ChartOutcome::Skipped(_)));
                assert!(!path.exists());
            } else {
                assert_eq!(outcome, &ChartOutcome::Written(path.clone()), "{file}");
                assert!(path.exists());
            }
        }
    }

    #[test]
    fn test_skipped_chart_removes_previous_image() {
        let dir = tempfile::tempdir().unwrap();
        render_all(&two_table_set(), &AnalysisConfig::default(), dir.path());
        let cost_path = dir.path().join(COST_CHART_FILE);
        assert!(cost_path.exists());

        let mut set = ResultSet::new();
        set.insert(0.05, table(&[(10, 2), (20, 4)]));
        let outcomes = render_all(&set, &AnalysisConfig::default(), dir.path());

        assert!(outcomes
            .iter()
            .any(|(file, o)| *file == COST_CHART_FILE && matches!(o, ChartOutcome::Skipped(_))));
        assert!(!cost_path.exists());
    }

    #[test]
    fn test_cost_chart_needs_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = ResultSet::new();
        set.insert(
            0.05,
            Table::new(vec![Observation::new(10, 2, 1.0)]).unwrap(),
        );
        let outcome = render_cost_effectiveness(
            &set,
            &AnalysisConfig::default(),
            &dir.path().join(COST_CHART_FILE),
        )
        .unwrap();
        assert_eq!(
            outcome,
            ChartOutcome::Skipped("no baseline (B = 0) table".into())
        );
    }
}
