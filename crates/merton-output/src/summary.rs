//! Run summary: load statistics, per-method diagnostics and DD/PD
//! distributions, written as JSON next to the result tables.

use crate::export::{ExportError, ExportFormat, Exporter};
use merton_data::LoadStats;
use merton_model::{BatchDiagnostics, Method, SolverResult};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Max, Min, OrderStatistics};
use std::fmt;

/// Summary statistics of a sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Distribution {
    /// Sample size.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation (ddof = 1), absent for a single value.
    pub std: Option<f64>,
    /// Smallest value.
    pub min: f64,
    /// Median.
    pub median: f64,
    /// Largest value.
    pub max: f64,
}

impl Distribution {
    /// Describe the finite values of `values`; `None` when there are none.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let finite: Array1<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        let mean = finite.mean()?;
        let count = finite.len();
        let std = (count > 1).then(|| finite.std(1.0));

        let mut data = Data::new(finite.to_vec());
        Some(Self {
            count,
            mean,
            std,
            min: data.min(),
            median: data.median(),
            max: data.max(),
        })
    }
}

/// Outcome of one method.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodSummary {
    /// Method run.
    pub method: Method,
    /// Rows written.
    pub rows: usize,
    /// Rows with `convergence == true`.
    pub converged: usize,
    /// Distance to default over converged rows.
    pub distance_to_default: Option<Distribution>,
    /// Probability of default over converged rows.
    pub default_probability: Option<Distribution>,
    /// Engine tallies.
    pub diagnostics: BatchDiagnostics,
}

impl MethodSummary {
    /// Summarise a method's result table.
    pub fn new(results: &[SolverResult], diagnostics: BatchDiagnostics) -> Self {
        let converged: Vec<_> = results.iter().filter(|r| r.estimate.converged).collect();
        Self {
            method: diagnostics.method,
            rows: results.len(),
            converged: converged.len(),
            distance_to_default: Distribution::from_values(
                converged.iter().filter_map(|r| r.estimate.distance_to_default),
            ),
            default_probability: Distribution::from_values(
                converged.iter().filter_map(|r| r.estimate.default_probability),
            ),
            diagnostics,
        }
    }
}

impl fmt::Display for MethodSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let totals = &self.diagnostics.totals;
        writeln!(f, "{}", self.method)?;
        writeln!(
            f,
            "  groups: {} ({} with results)",
            self.diagnostics.groups, self.diagnostics.groups_with_results
        )?;
        writeln!(
            f,
            "  dates: {} evaluated, {} skipped (short {}, missing {}, n/a {})",
            totals.dates_evaluated,
            totals.skipped(),
            totals.skipped_short_window,
            totals.skipped_missing_inputs,
            totals.skipped_not_applicable
        )?;
        writeln!(f, "  rows: {} ({} converged)", self.rows, self.converged)?;
        if let Some(dd) = &self.distance_to_default {
            writeln!(
                f,
                "  DD: mean {:.4}, median {:.4}, range [{:.4}, {:.4}]",
                dd.mean, dd.median, dd.min, dd.max
            )?;
        }
        if let Some(pd) = &self.default_probability {
            writeln!(f, "  PD: mean {:.6}, median {:.6}", pd.mean, pd.median)?;
        }
        write!(f, "  wall time: {:.2}s", self.diagnostics.wall_secs)
    }
}

/// Panel load statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PanelSummary {
    /// Data rows read.
    pub rows_read: usize,
    /// Rows dropped for missing equity value.
    pub dropped_missing_equity: usize,
    /// Rows dropped for a zero E, D or rf.
    pub dropped_zero_inputs: usize,
    /// Duplicate firm-date rows discarded.
    pub duplicate_keys: usize,
    /// Rows kept.
    pub rows_kept: usize,
    /// Firm groups.
    pub groups: usize,
}

impl PanelSummary {
    /// Build from loader statistics and the group count.
    pub const fn new(stats: &LoadStats, groups: usize) -> Self {
        Self {
            rows_read: stats.rows_read,
            dropped_missing_equity: stats.dropped_missing_equity,
            dropped_zero_inputs: stats.dropped_zero_inputs,
            duplicate_keys: stats.duplicate_keys,
            rows_kept: stats.rows_kept,
            groups,
        }
    }
}

/// Everything recorded about a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// Crate version that produced the run.
    pub version: String,
    /// Local start time, RFC 3339.
    pub started_at: String,
    /// Look-back lag convention.
    pub lag_convention: String,
    /// Whether the trading calendar was derived from the panel.
    pub derived_calendar: bool,
    /// Panel load statistics.
    pub panel: PanelSummary,
    /// One entry per method run.
    pub methods: Vec<MethodSummary>,
}

impl Exporter for RunSummary {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
            ExportFormat::Pipe => Err(ExportError::InvalidFormat(
                "run summary is JSON only".to_string(),
            )),
        }
    }
}
