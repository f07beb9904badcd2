//! Result table export.
//!
//! Tables are written pipe-separated with a header row. Undefined numbers are
//! written as `NaN`, booleans as `true`/`false`. Every method shares the same
//! column layout.

use chrono::NaiveDate;
use merton_model::{Method, SolverResult};
use serde::{Serialize, Serializer};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Delimited serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Pipe-separated values with a header row.
    Pipe,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Pipe => "txt",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

/// Trait for types that can be exported to various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn nan_if_none<S: Serializer>(value: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(value.unwrap_or(f64::NAN))
}

fn count_or_nan<S: Serializer>(value: &Option<usize>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(n) => s.serialize_u64(*n as u64),
        None => s.serialize_str("NaN"),
    }
}

/// One output line.
#[derive(Debug, Clone, Serialize)]
struct ResultRow<'a> {
    gvkey: &'a str,
    fyr: i64,
    permco: i64,
    permno: i64,
    date: NaiveDate,
    gsubind: &'a str,
    fic: &'a str,
    cusip: &'a str,
    #[serde(rename = "A", serialize_with = "nan_if_none")]
    assets: Option<f64>,
    #[serde(rename = "E")]
    equity: f64,
    #[serde(rename = "D")]
    debt: f64,
    rf: f64,
    #[serde(rename = "DD", serialize_with = "nan_if_none")]
    dd: Option<f64>,
    #[serde(rename = "PD", serialize_with = "nan_if_none")]
    pd: Option<f64>,
    #[serde(rename = "V", serialize_with = "nan_if_none")]
    asset_value: Option<f64>,
    #[serde(rename = "sigma_V", serialize_with = "nan_if_none")]
    asset_volatility: Option<f64>,
    #[serde(rename = "mean_V", serialize_with = "nan_if_none")]
    mean_asset_return: Option<f64>,
    convergence: bool,
    #[serde(serialize_with = "count_or_nan")]
    iters: Option<usize>,
    #[serde(serialize_with = "nan_if_none")]
    converge_check: Option<f64>,
    #[serde(serialize_with = "nan_if_none")]
    iteration_time: Option<f64>,
}

impl<'a> ResultRow<'a> {
    fn new(result: &'a SolverResult, timings: bool) -> Self {
        let estimate = &result.estimate;
        Self {
            gvkey: &result.key.gvkey,
            fyr: result.key.fyr,
            permco: result.key.permco,
            permno: result.key.permno,
            date: result.date,
            gsubind: result.sector.as_deref().unwrap_or_default(),
            fic: result.country.as_deref().unwrap_or_default(),
            cusip: result.cusip.as_deref().unwrap_or_default(),
            assets: result.assets,
            equity: result.inputs.equity,
            debt: result.inputs.debt,
            rf: result.inputs.risk_free,
            dd: estimate.distance_to_default,
            pd: estimate.default_probability,
            asset_value: estimate.asset_value,
            asset_volatility: estimate.asset_volatility,
            mean_asset_return: estimate.mean_asset_return,
            convergence: estimate.converged,
            iters: estimate.iterations,
            converge_check: estimate.converge_check,
            iteration_time: timings.then_some(result.elapsed_secs),
        }
    }
}

/// The result table of one method.
#[derive(Debug, Clone, Copy)]
pub struct ResultTable<'a> {
    method: Method,
    rows: &'a [SolverResult],
    timings: bool,
}

impl<'a> ResultTable<'a> {
    /// Wrap sorted result rows. Timings are written by default.
    pub const fn new(method: Method, rows: &'a [SolverResult]) -> Self {
        Self {
            method,
            rows,
            timings: true,
        }
    }

    /// Write `iteration_time` as `NaN` instead of the measured time, making
    /// the output identical across runs on the same input.
    pub const fn without_timings(mut self) -> Self {
        self.timings = false;
        self
    }

    /// Method of the rows.
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Number of rows.
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Conventional file name for the table, e.g. `merton_iterated.txt`.
    pub fn file_name(&self) -> String {
        format!("merton_{}.{}", self.method, ExportFormat::Pipe.extension())
    }

    fn records(&self) -> impl Iterator<Item = ResultRow<'a>> + '_ {
        self.rows.iter().map(|r| ResultRow::new(r, self.timings))
    }
}

/// Column names of a result table, in order.
pub const RESULT_COLUMNS: [&str; 21] = [
    "gvkey",
    "fyr",
    "permco",
    "permno",
    "date",
    "gsubind",
    "fic",
    "cusip",
    "A",
    "E",
    "D",
    "rf",
    "DD",
    "PD",
    "V",
    "sigma_V",
    "mean_V",
    "convergence",
    "iters",
    "converge_check",
    "iteration_time",
];

impl Exporter for ResultTable<'_> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Pipe => {
                let mut wtr = csv::WriterBuilder::new()
                    .delimiter(b'|')
                    .has_headers(false)
                    .from_writer(vec![]);
                wtr.write_record(RESULT_COLUMNS)?;
                for record in self.records() {
                    wtr.serialize(record)?;
                }
                let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
                String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
            }
            ExportFormat::Json => Ok(serde_json::to_string(&self.records().collect::<Vec<_>>())?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(
                &self.records().collect::<Vec<_>>(),
            )?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merton_data::{FirmKey, ModelInputs};
    use merton_model::Estimate;

    fn result(gvkey: &str, estimate: Estimate) -> SolverResult {
        SolverResult {
            key: FirmKey::new(gvkey, 12, 10, 20),
            date: NaiveDate::from_ymd_opt(2003, 6, 30).unwrap(),
            sector: Some("45102010".to_string()),
            country: Some("USA".to_string()),
            cusip: None,
            assets: None,
            inputs: ModelInputs {
                equity: 100.0,
                debt: 50.0,
                risk_free: 0.02,
            },
            estimate,
            elapsed_secs: 0.25,
        }
    }

    #[test]
    fn test_header_and_undefined_values() {
        let rows = vec![result("001004", Estimate::failed(Some(10), None))];
        let table = ResultTable::new(Method::Iterated, &rows);
        let text = table.export_to_string(ExportFormat::Pipe).unwrap();
        let mut lines = text.lines();

        assert_eq!(lines.next().unwrap(), RESULT_COLUMNS.join("|"));
        assert_eq!(
            lines.next().unwrap(),
            "001004|12|10|20|2003-06-30|45102010|USA||NaN|100.0|50.0|0.02|NaN|NaN|NaN|NaN|NaN|false|10|NaN|0.25"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_converged_row() {
        let estimate = Estimate {
            distance_to_default: Some(2.5),
            default_probability: Some(0.006),
            asset_value: Some(149.0),
            asset_volatility: Some(0.2),
            mean_asset_return: None,
            converged: true,
            iterations: Some(4),
            converge_check: Some(0.5),
        };
        let rows = vec![result("001004", estimate)];
        let text = ResultTable::new(Method::Simultaneous, &rows)
            .without_timings()
            .export_to_string(ExportFormat::Pipe)
            .unwrap();
        let line = text.lines().nth(1).unwrap();
        assert!(line.ends_with("|2.5|0.006|149.0|0.2|NaN|true|4|0.5|NaN"));
    }

    #[test]
    fn test_file_name() {
        let rows = Vec::new();
        assert_eq!(
            ResultTable::new(Method::Simultaneous, &rows).file_name(),
            "merton_simultaneous.txt"
        );
    }

    #[test]
    fn test_empty_table_has_header_only() {
        let rows = Vec::new();
        let text = ResultTable::new(Method::Iterated, &rows)
            .export_to_string(ExportFormat::Pipe)
            .unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
