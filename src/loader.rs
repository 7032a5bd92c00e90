//! Base loader: copies a directory of CSV files into pre-declared tables.
//!
//! Each `<table>.csv` fills `<table>` row for row. Headers are camelCase in
//! the source data and are normalised to the snake_case column names of the
//! schema scripts; the literal `\N` becomes NULL and `\\N` (written by export
//! for text that reads `\N`) loses one backslash. Nothing is coerced here,
//! the column affinities declared by the schema decide the stored types.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use rusqlite::params_from_iter;
use tracing::{debug, info};

use crate::error::{F1dbError, F1dbResult};
use crate::store::{is_null_token_like, quote_identifier, Store, NULL_TOKEN};

static CAMEL_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z])([A-Z])").unwrap());

/// `driverRef` -> `driver_ref`, `fastestLapSpeed` -> `fastest_lap_speed`.
pub fn normalize_column_name(header: &str) -> String {
    CAMEL_BOUNDARY.replace_all(header.trim(), "${1}_${2}").to_lowercase()
}

/// Map one raw field to the value bound for insert.
pub fn normalize_cell(raw: Option<&str>) -> Option<&str> {
    match raw {
        Some(NULL_TOKEN) | None => None,
        // escaped marker text written by export
        Some(v) if is_null_token_like(v) => Some(&v[1..]),
        Some(v) => Some(v),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// (table, rows inserted) in load order.
    pub tables: Vec<(String, usize)>,
}

impl LoadReport {
    pub fn total_rows(&self) -> usize { self.tables.iter().map(|(_, n)| n).sum() }

    pub fn rows_for(&self, table: &str) -> Option<usize> {
        self.tables.iter().find(|(t, _)| t == table).map(|(_, n)| *n)
    }
}

/// Read a CSV with every column kept as text; typing is the engine's job.
pub fn read_csv(path: &Path) -> F1dbResult<DataFrame> {
    let csv_err = |source| F1dbError::Csv { path: path.to_path_buf(), source };
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| opts.with_missing_is_null(false))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(csv_err)?
        .finish()
        .map_err(csv_err)
}

pub struct BaseLoader<'s> {
    store: &'s Store,
}

impl<'s> BaseLoader<'s> {
    pub fn new(store: &'s Store) -> Self { Self { store } }

    /// Load every `.csv` file in `dir`, in file-name order. The first failing
    /// table aborts the load; tables already loaded stay loaded.
    pub fn load_directory(&self, dir: &Path) -> F1dbResult<LoadReport> {
        let _enter = self.store.context().span().enter();
        if !dir.is_dir() {
            return Err(F1dbError::MissingInput { what: "csv directory", path: dir.to_path_buf() });
        }
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("csv")).unwrap_or(false))
            .collect();
        files.sort();

        let mut report = LoadReport::default();
        for path in files {
            let (table, rows) = self.load_file(&path)?;
            report.tables.push((table, rows));
        }
        info!(dir = %dir.display(), tables = report.tables.len(), rows = report.total_rows(), "csv directory loaded");
        Ok(report)
    }

    /// Load one file into the table named after its stem. All rows go in one
    /// transaction.
    pub fn load_file(&self, path: &Path) -> F1dbResult<(String, usize)> {
        let table = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| F1dbError::InvalidIdentifier(path.display().to_string()))?
            .to_string();
        let df = read_csv(path)?;
        let rows = self.insert_frame(&table, &df)?;
        debug!(table = %table, rows, "table loaded");
        Ok((table, rows))
    }

    /// Insert every row of an all-text frame into `table`.
    pub fn insert_frame(&self, table: &str, df: &DataFrame) -> F1dbResult<usize> {
        let load_err = |source| F1dbError::Load { table: table.to_string(), source };
        let columns = df
            .get_columns()
            .iter()
            .map(|c| quote_identifier(&normalize_column_name(c.name())))
            .collect::<F1dbResult<Vec<_>>>()?;
        let marks = vec!["?"; columns.len()].join(", ");
        let sql = format!("INSERT INTO {} ({}) VALUES ({})", quote_identifier(table)?, columns.join(", "), marks);

        let text_columns = df
            .get_columns()
            .iter()
            .map(|c| c.as_materialized_series().str().map(|ca| ca.clone()))
            .collect::<PolarsResult<Vec<StringChunked>>>()?;

        let conn = self.store.connection();
        let tx = conn.unchecked_transaction().map_err(load_err)?;
        {
            let mut stmt = tx.prepare(&sql).map_err(load_err)?;
            for i in 0..df.height() {
                let values = text_columns.iter().map(|ca| normalize_cell(ca.get(i)));
                stmt.execute(params_from_iter(values)).map_err(load_err)?;
            }
        }
        tx.commit().map_err(load_err)?;
        Ok(df.height())
    }
}
