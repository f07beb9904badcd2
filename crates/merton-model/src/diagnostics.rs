//! Counters describing what happened to each evaluation date.

use crate::solver::Method;
use serde::{Deserialize, Serialize};

/// Per-group tallies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupDiagnostics {
    /// Month-end dates considered
    pub dates_evaluated: usize,
    /// Dates skipped because the window was shorter than the minimum
    pub skipped_short_window: usize,
    /// Dates skipped because E, D or rf was missing on the evaluation date
    pub skipped_missing_inputs: usize,
    /// Dates the solver declined as not applicable
    pub skipped_not_applicable: usize,
    /// Dates that produced a result row
    pub solved: usize,
    /// Result rows with `convergence == false`
    pub non_converged: usize,
    /// Time spent on the group in seconds
    pub elapsed_secs: f64,
}

impl GroupDiagnostics {
    /// Add another tally into this one.
    pub fn merge(&mut self, other: &Self) {
        self.dates_evaluated += other.dates_evaluated;
        self.skipped_short_window += other.skipped_short_window;
        self.skipped_missing_inputs += other.skipped_missing_inputs;
        self.skipped_not_applicable += other.skipped_not_applicable;
        self.solved += other.solved;
        self.non_converged += other.non_converged;
        self.elapsed_secs += other.elapsed_secs;
    }

    /// Dates skipped for any reason.
    pub const fn skipped(&self) -> usize {
        self.skipped_short_window + self.skipped_missing_inputs + self.skipped_not_applicable
    }
}

/// Totals over one batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchDiagnostics {
    /// Method run
    pub method: Method,
    /// Worker threads used
    pub threads: usize,
    /// Firm groups processed
    pub groups: usize,
    /// Groups contributing at least one row
    pub groups_with_results: usize,
    /// Sum of the per-group tallies; `elapsed_secs` is summed task time
    pub totals: GroupDiagnostics,
    /// Wall-clock time of the batch in seconds
    pub wall_secs: f64,
}

impl BatchDiagnostics {
    /// Empty tally for a method.
    pub fn new(method: Method, threads: usize) -> Self {
        Self {
            method,
            threads,
            groups: 0,
            groups_with_results: 0,
            totals: GroupDiagnostics::default(),
            wall_secs: 0.0,
        }
    }

    /// Record one group's tally.
    pub fn record(&mut self, group: &GroupDiagnostics) {
        self.groups += 1;
        if group.solved > 0 {
            self.groups_with_results += 1;
        }
        self.totals.merge(group);
    }

    /// Share of result rows that converged, `None` without rows.
    pub fn convergence_rate(&self) -> Option<f64> {
        let solved = self.totals.solved;
        (solved > 0).then(|| (solved - self.totals.non_converged) as f64 / solved as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_record_accumulates() {
        let mut batch = BatchDiagnostics::new(Method::Iterated, 4);
        batch.record(&GroupDiagnostics {
            dates_evaluated: 12,
            skipped_short_window: 2,
            solved: 10,
            non_converged: 1,
            ..Default::default()
        });
        batch.record(&GroupDiagnostics {
            dates_evaluated: 3,
            skipped_short_window: 3,
            ..Default::default()
        });

        assert_eq!(batch.groups, 2);
        assert_eq!(batch.groups_with_results, 1);
        assert_eq!(batch.totals.dates_evaluated, 15);
        assert_eq!(batch.totals.skipped(), 5);
        assert_relative_eq!(batch.convergence_rate().unwrap(), 0.9);
    }

    #[test]
    fn test_no_rows_has_no_rate() {
        assert!(BatchDiagnostics::new(Method::Simultaneous, 1).convergence_rate().is_none());
    }
}
