use std::collections::btree_map;
use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::Deserialize;

/// Fault-injection parameter of one calibration run, usable as a map key.
pub type FailureProb = OrderedFloat<f64>;

/// One calibration point: the smallest robot count that served `n` items.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Observation {
    #[serde(rename = "N")]
    pub n: u32,
    #[serde(rename = "R_min")]
    pub r_min: u32,
    pub success_rate: f64,
}

impl Observation {
    pub fn new(n: u32, r_min: u32, success_rate: f64) -> Self {
        Self {
            n,
            r_min,
            success_rate,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TableError {
    #[error("workload N={n} is not strictly greater than the previous row (N={prev})")]
    UnsortedWorkload { prev: u32, n: u32 },
    #[error("success rate {rate} at N={n} is outside [0, 1]")]
    SuccessRateOutOfRange { n: u32, rate: f64 },
}

/// Observations of a single failure probability, ordered by workload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<Observation>,
}

impl Table {
    pub fn new(rows: Vec<Observation>) -> Result<Self, TableError> {
        for window in rows.windows(2) {
            if window[1].n <= window[0].n {
                return Err(TableError::UnsortedWorkload {
                    prev: window[0].n,
                    n: window[1].n,
                });
            }
        }
        if let Some(row) = rows
            .iter()
            .find(|r| !(0.0..=1.0).contains(&r.success_rate))
        {
            return Err(TableError::SuccessRateOutOfRange {
                n: row.n,
                rate: row.success_rate,
            });
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact lookup by workload.
    pub fn find(&self, n: u32) -> Option<&Observation> {
        self.rows
            .binary_search_by_key(&n, |r| r.n)
            .ok()
            .map(|idx| &self.rows[idx])
    }

    pub fn n_range(&self) -> Option<(u32, u32)> {
        Some((self.rows.first()?.n, self.rows.last()?.n))
    }

    pub fn r_min_range(&self) -> Option<(u32, u32)> {
        let min = self.rows.iter().map(|r| r.r_min).min()?;
        let max = self.rows.iter().map(|r| r.r_min).max()?;
        Some((min, max))
    }
}

/// All loaded tables, iterated in ascending failure probability.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    tables: BTreeMap<FailureProb, Table>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table previously stored under the same key, if any.
    pub fn insert(&mut self, failure_prob: f64, table: Table) -> Option<Table> {
        self.tables.insert(OrderedFloat(failure_prob), table)
    }

    pub fn get(&self, failure_prob: f64) -> Option<&Table> {
        self.tables.get(&OrderedFloat(failure_prob))
    }

    /// The zero-failure table every comparison is made against.
    pub fn baseline(&self) -> Option<&Table> {
        self.get(0.0)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, FailureProb, Table> {
        self.tables.iter()
    }

    pub fn failure_probs(&self) -> impl Iterator<Item = f64> + '_ {
        self.tables.keys().map(|k| k.into_inner())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = (&'a FailureProb, &'a Table);
    type IntoIter = btree_map::Iter<'a, FailureProb, Table>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.iter()
    }
}
