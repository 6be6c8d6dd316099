use std::fs;
use std::path::{Path, PathBuf};

use calib_shared::config::{decode_file_name, matches_input_pattern};
use calib_shared::{Observation, ResultSet, Table, TableError};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read results directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode {}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },
    #[error("invalid table in {}: {source}", path.display())]
    Table { path: PathBuf, source: TableError },
}

/// Loads every `r_vs_n_B<value>.csv` file in `dir`.
///
/// Only an unreadable directory is an error. Files whose name does not
/// decode, or whose contents fail to parse or validate, are skipped with a
/// warning; an empty set is returned when nothing matched.
pub fn load_result_set(dir: &Path) -> Result<ResultSet, LoadError> {
    let mut files = matching_files(dir)?;
    files.sort();

    if files.is_empty() {
        warn!(dir = %dir.display(), "no calibration files found");
    }

    let mut set = ResultSet::new();
    for (name, path) in files {
        let Some(failure_prob) = decode_file_name(&name) else {
            warn!(file = %name, "could not extract failure probability from file name, skipping");
            continue;
        };

        let table = match load_table(&path) {
            Ok(table) => table,
            Err(e) => {
                warn!("{e}, skipping");
                continue;
            }
        };

        info!(file = %name, points = table.len(), "loaded");
        if set.insert(failure_prob, table).is_some() {
            warn!(file = %name, failure_prob, "duplicate failure probability, keeping the later file");
        }
    }

    Ok(set)
}

/// Parses one calibration CSV. Columns beyond `N`, `R_min` and
/// `success_rate` are ignored.
pub fn load_table(path: &Path) -> Result<Table, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let mut rows = Vec::new();
    for record in reader.deserialize::<Observation>() {
        let row = record.map_err(csv_err)?;
        debug!(n = row.n, r_min = row.r_min, success_rate = row.success_rate, "row");
        rows.push(row);
    }

    Table::new(rows).map_err(|source| LoadError::Table {
        path: path.to_path_buf(),
        source,
    })
}

fn matching_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, LoadError> {
    let read_err = |source| LoadError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if matches_input_pattern(name) {
            files.push((name.to_string(), path.clone()));
        }
    }
    Ok(files)
}
