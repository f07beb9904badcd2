//! Per-group processing: every month-end date of one firm.

use merton_data::{FirmGroup, FirmKey, TradingCalendar};
use merton_model::{
    GroupDiagnostics, MertonSolver, SolverError, SolverResult, evaluation_window, month_end_dates,
};
use std::time::Instant;
use tracing::debug;

/// Results and tallies for one firm group.
#[derive(Debug, Clone)]
pub struct GroupOutput {
    /// Firm identity
    pub key: FirmKey,
    /// One row per solved month-end date, ascending by date
    pub results: Vec<SolverResult>,
    /// What happened to each date
    pub diagnostics: GroupDiagnostics,
}

/// Evaluate every month-end date of `group` with `solver`.
///
/// Dates whose window is too short or whose evaluation day lacks E, D or rf
/// produce no row; neither does a window the solver declines.
pub fn process_group(
    group: &FirmGroup,
    calendar: &TradingCalendar,
    solver: &dyn MertonSolver,
) -> GroupOutput {
    let started = Instant::now();
    let config = solver.config();
    let mut diagnostics = GroupDiagnostics::default();
    let mut results = Vec::new();

    for date in month_end_dates(group) {
        diagnostics.dates_evaluated += 1;

        let window = evaluation_window(group, date, calendar, config.lag);
        if window.len() < config.min_observations {
            diagnostics.skipped_short_window += 1;
            continue;
        }
        let (Some(last), Some(inputs)) = (window.last(), window.last_inputs()) else {
            diagnostics.skipped_missing_inputs += 1;
            continue;
        };

        let solve_started = Instant::now();
        match solver.solve(&window) {
            Ok(estimate) => {
                if !estimate.converged {
                    diagnostics.non_converged += 1;
                }
                diagnostics.solved += 1;
                results.push(SolverResult::new(
                    group.key(),
                    last,
                    inputs,
                    estimate,
                    solve_started.elapsed().as_secs_f64(),
                ));
            }
            Err(SolverError::NotApplicable { reason }) => {
                debug!(key = %group.key(), %date, %reason, "Skipping window");
                diagnostics.skipped_not_applicable += 1;
            }
        }
    }

    diagnostics.elapsed_secs = started.elapsed().as_secs_f64();
    debug!(
        key = %group.key(),
        method = %solver.method(),
        solved = diagnostics.solved,
        skipped = diagnostics.skipped(),
        elapsed_secs = diagnostics.elapsed_secs,
        "Group processed"
    );

    GroupOutput {
        key: group.key().clone(),
        results,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use merton_data::Observation;
    use merton_model::{Method, ModelConfig, solver_for};

    fn trading_days(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(1999, 1, 4).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    fn group(days: &[NaiveDate]) -> FirmGroup {
        FirmGroup::new(
            FirmKey::new("012345", 12, 7, 9),
            days.iter()
                .map(|d| Observation::new(*d, Some(100.0), Some(50.0), Some(0.02)))
                .collect(),
        )
    }

    #[test]
    fn test_forty_nine_observations_give_no_result() {
        let days = trading_days(49);
        let calendar = TradingCalendar::new(days.clone()).unwrap();
        let solver = solver_for(Method::Simultaneous, ModelConfig::default());

        let output = process_group(&group(&days), &calendar, solver.as_ref());
        assert!(output.results.is_empty());
        assert_eq!(output.diagnostics.solved, 0);
        assert_eq!(
            output.diagnostics.skipped_short_window,
            output.diagnostics.dates_evaluated
        );
    }

    #[test]
    fn test_missing_evaluation_inputs_are_skipped() {
        let days = trading_days(90);
        let calendar = TradingCalendar::new(days.clone()).unwrap();
        let mut observations: Vec<Observation> = days
            .iter()
            .map(|d| Observation::new(*d, Some(100.0), Some(50.0), Some(0.02)))
            .collect();
        // Last day of the first full month with enough history lacks rf.
        let march_end = NaiveDate::from_ymd_opt(1999, 3, 31).unwrap();
        if let Some(obs) = observations.iter_mut().find(|o| o.date == march_end) {
            obs.risk_free = None;
        }
        let group = FirmGroup::new(FirmKey::new("1", 1, 1, 1), observations);
        let solver = solver_for(Method::Simultaneous, ModelConfig::default());

        let output = process_group(&group, &calendar, solver.as_ref());
        assert_eq!(output.diagnostics.skipped_missing_inputs, 1);
        assert!(output.results.iter().all(|r| r.date != march_end));
        assert!(!output.results.is_empty());
    }

    #[test]
    fn test_results_are_month_ends_in_order() {
        let days = trading_days(200);
        let calendar = TradingCalendar::new(days.clone()).unwrap();
        let solver = solver_for(Method::Simultaneous, ModelConfig::default());

        let output = process_group(&group(&days), &calendar, solver.as_ref());
        let dates: Vec<_> = output.results.iter().map(|r| r.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
        assert_eq!(output.diagnostics.solved, output.results.len());
        assert!(output.results.iter().all(|r| r.estimate.converged));
    }
}
