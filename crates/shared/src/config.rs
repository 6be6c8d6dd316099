// Simulator output conventions
pub const INPUT_PREFIX: &str = "r_vs_n_B";
pub const INPUT_SUFFIX: &str = ".csv";

pub const COMPARISON_CHART_FILE: &str = "r_vs_n_comparison.png";
pub const COST_CHART_FILE: &str = "cost_effectiveness.png";
pub const REDUNDANCY_CHART_FILE: &str = "redundancy_analysis.png";
pub const REPORT_FILE: &str = "analysis_report.txt";

// Analysis defaults
pub const MAX_ROBOTS: u32 = 20;
pub const LOW_LOAD_FRACTION: f64 = 0.3;
pub const OVERPROVISION_FACTOR: f64 = 1.2; // +20% band
pub const SAMPLE_WORKLOADS: [u32; 5] = [10, 20, 30, 40, 50];
pub const REPORT_WORKLOAD: u32 = 30;
pub const REPORT_FAILURE_PROB: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Largest robot count the simulator searched. Rows above it mark a
    /// workload that could not be satisfied.
    pub max_robots: u32,
    pub low_load_fraction: f64,
    pub overprovision_factor: f64,
    pub sample_workloads: Vec<u32>,
    pub report_workload: u32,
    pub report_failure_prob: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_robots: MAX_ROBOTS,
            low_load_fraction: LOW_LOAD_FRACTION,
            overprovision_factor: OVERPROVISION_FACTOR,
            sample_workloads: SAMPLE_WORKLOADS.to_vec(),
            report_workload: REPORT_WORKLOAD,
            report_failure_prob: REPORT_FAILURE_PROB,
        }
    }
}

impl AnalysisConfig {
    pub fn with_max_robots(self, max_robots: u32) -> Self {
        Self { max_robots, ..self }
    }

    /// Whether `r_min` is a robot count the simulator actually found.
    #[inline]
    pub fn is_valid(&self, r_min: u32) -> bool {
        r_min <= self.max_robots
    }
}

/// Builds the on-disk file name for a failure probability, as the simulator
/// writes it.
pub fn input_file_name(failure_prob: f64) -> String {
    format!("{INPUT_PREFIX}{failure_prob:.3}{INPUT_SUFFIX}")
}

/// Extracts the failure probability encoded in an input file name. Returns
/// `None` when the name does not follow the simulator's pattern or the middle
/// segment is not a number.
pub fn decode_file_name(name: &str) -> Option<f64> {
    let middle = name.strip_prefix(INPUT_PREFIX)?.strip_suffix(INPUT_SUFFIX)?;
    let value: f64 = middle.parse().ok()?;
    value.is_finite().then_some(value)
}

/// Cheap name filter applied before decoding, so that unrelated files in the
/// directory are ignored silently.
pub fn matches_input_pattern(name: &str) -> bool {
    name.starts_with(INPUT_PREFIX) && name.ends_with(INPUT_SUFFIX)
}
