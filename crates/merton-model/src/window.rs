//! Evaluation dates and trailing evaluation windows.

use chrono::{Datelike, NaiveDate};
use merton_data::{FirmGroup, LagConvention, ModelInputs, Observation, TradingCalendar};

/// The observations of one firm used to evaluate one date.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationWindow<'a> {
    date: NaiveDate,
    observations: &'a [Observation],
}

impl<'a> EvaluationWindow<'a> {
    /// Wrap an ordered slice of observations ending at `date`.
    pub const fn new(date: NaiveDate, observations: &'a [Observation]) -> Self {
        Self { date, observations }
    }

    /// Evaluation date.
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Observations in ascending date order.
    pub const fn observations(&self) -> &'a [Observation] {
        self.observations
    }

    /// Number of observations.
    pub const fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the window is empty.
    pub const fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Last observation of the window.
    pub fn last(&self) -> Option<&'a Observation> {
        self.observations.last()
    }

    /// E, D and rf of the last observation, when all are present.
    pub fn last_inputs(&self) -> Option<ModelInputs> {
        self.last().and_then(Observation::model_inputs)
    }
}

/// Month-end evaluation dates of a group: the latest observation date in each
/// (year, month) present, ascending.
pub fn month_end_dates(group: &FirmGroup) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = Vec::new();
    for obs in group.observations() {
        match dates.last_mut() {
            Some(last) if (last.year(), last.month()) == (obs.date.year(), obs.date.month()) => {
                *last = obs.date;
            }
            _ => dates.push(obs.date),
        }
    }
    dates
}

/// Observations of `group` with `lag_date(date) < obs.date <= date`.
///
/// When the calendar has no lag date the window starts at the beginning of
/// the group's history.
pub fn evaluation_window<'a>(
    group: &'a FirmGroup,
    date: NaiveDate,
    calendar: &TradingCalendar,
    lag: LagConvention,
) -> EvaluationWindow<'a> {
    let observations = group.observations();
    let end = observations.partition_point(|o| o.date <= date);
    let start = calendar
        .lag_date(date, lag)
        .map_or(0, |lag_date| observations.partition_point(|o| o.date <= lag_date));
    EvaluationWindow::new(date, &observations[start.min(end)..end])
}
