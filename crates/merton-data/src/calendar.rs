//! Trading calendar and look-back lag lookups.
//!
//! The estimation window for an evaluation date reaches back a fixed number
//! of *trading* days. The lag is found by shifting positions in the sorted
//! calendar, not by subtracting wall-clock days, so that window length lines
//! up with the 252-trading-day annualisation used by the volatility estimates.

use crate::error::{DataError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Default look-back in trading days.
pub const DEFAULT_LOOKBACK_DAYS: usize = 250;

/// How the look-back lag date is derived from an evaluation date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LagConvention {
    /// Shift back this many positions in the trading calendar.
    TradingDays(usize),
    /// Subtract this many wall-clock days.
    CalendarDays(i64),
}

impl Default for LagConvention {
    fn default() -> Self {
        Self::TradingDays(DEFAULT_LOOKBACK_DAYS)
    }
}

impl fmt::Display for LagConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TradingDays(n) => write!(f, "{} trading days (positional)", n),
            Self::CalendarDays(n) => write!(f, "{} calendar days", n),
        }
    }
}

/// Ascending, de-duplicated sequence of trading dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingCalendar {
    dates: Vec<NaiveDate>,
}

impl TradingCalendar {
    /// Build a calendar from arbitrary dates (sorted and de-duplicated here).
    ///
    /// # Errors
    /// Returns [`DataError::EmptyCalendar`] when no dates are given.
    pub fn new(mut dates: Vec<NaiveDate>) -> Result<Self> {
        if dates.is_empty() {
            return Err(DataError::EmptyCalendar);
        }
        dates.sort_unstable();
        dates.dedup();
        Ok(Self { dates })
    }

    /// Load a calendar file: a `date` header followed by one date per line.
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    /// Load a calendar from any reader. Extra columns are ignored.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'|')
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let date_idx = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case("date") || h.eq_ignore_ascii_case("caldt"))
            .ok_or_else(|| DataError::MissingColumn {
                column: "date".to_string(),
                source_name: "trading calendar".to_string(),
            })?;

        let mut dates = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let line = record.position().map_or(0, |p| p.line());
            let raw = record.get(date_idx).unwrap_or_default();
            if raw.is_empty() {
                continue;
            }
            let date = crate::panel::parse_date(raw).ok_or_else(|| DataError::Parse {
                line,
                reason: format!("invalid calendar date '{}'", raw),
            })?;
            dates.push(date);
        }

        Self::new(dates)
    }

    /// All trading dates in ascending order.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of trading dates.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Always false for a constructed calendar; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// First trading date.
    pub fn first(&self) -> NaiveDate {
        self.dates[0]
    }

    /// Last trading date.
    pub fn last(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// Whether `date` is a trading date.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.binary_search(&date).is_ok()
    }

    /// Whether the calendar spans `[start, end]`.
    pub fn covers(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.first() <= start && end <= self.last()
    }

    /// Look-back lag date for `date`.
    ///
    /// With [`LagConvention::TradingDays`] the date is anchored on the latest
    /// trading date not after it and shifted back `n` positions; `None` when
    /// fewer than `n` trading dates precede the anchor.
    pub fn lag_date(&self, date: NaiveDate, convention: LagConvention) -> Option<NaiveDate> {
        match convention {
            LagConvention::TradingDays(n) => {
                let anchor = self.dates.partition_point(|d| *d <= date).checked_sub(1)?;
                anchor.checked_sub(n).map(|idx| self.dates[idx])
            }
            LagConvention::CalendarDays(n) => date.checked_sub_signed(Duration::days(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn business_days(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
        use chrono::{Datelike, Weekday};
        let mut out = Vec::with_capacity(n);
        let mut d = start;
        while out.len() < n {
            if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
                out.push(d);
            }
            d = d.succ_opt().unwrap();
        }
        out
    }

    #[test]
    fn test_empty_calendar_rejected() {
        assert!(matches!(
            TradingCalendar::new(vec![]),
            Err(DataError::EmptyCalendar)
        ));
    }

    #[test]
    fn test_trading_day_lag_is_positional() {
        let start = NaiveDate::from_ymd_opt(2000, 1, 3).unwrap();
        let days = business_days(start, 400);
        let cal = TradingCalendar::new(days.clone()).unwrap();

        assert_eq!(
            cal.lag_date(days[300], LagConvention::TradingDays(250)),
            Some(days[50])
        );
        assert_eq!(
            cal.lag_date(days[250], LagConvention::TradingDays(250)),
            Some(days[0])
        );
        assert_eq!(cal.lag_date(days[249], LagConvention::TradingDays(250)), None);
    }

    #[test]
    fn test_lag_anchors_on_previous_trading_day() {
        let start = NaiveDate::from_ymd_opt(2000, 1, 3).unwrap();
        let days = business_days(start, 300);
        let cal = TradingCalendar::new(days.clone()).unwrap();

        // days[4] is a Friday; the following Saturday is not a trading date.
        let saturday = days[4].succ_opt().unwrap();
        assert!(!cal.contains(saturday));
        assert_eq!(
            cal.lag_date(saturday, LagConvention::TradingDays(2)),
            Some(days[2])
        );
        let before_start = start.pred_opt().unwrap();
        assert_eq!(cal.lag_date(before_start, LagConvention::TradingDays(0)), None);
    }

    #[test]
    fn test_calendar_day_lag() {
        let cal = TradingCalendar::new(vec![NaiveDate::from_ymd_opt(2000, 1, 3).unwrap()]).unwrap();
        let date = NaiveDate::from_ymd_opt(2001, 3, 1).unwrap();
        assert_eq!(
            cal.lag_date(date, LagConvention::CalendarDays(365)),
            NaiveDate::from_ymd_opt(2000, 3, 1)
        );
    }

    #[test]
    fn test_from_reader_sorts_and_dedups() {
        let text = "date\n2000-01-05\n2000-01-03\n2000-01-04\n2000-01-04\n";
        let cal = TradingCalendar::from_reader(text.as_bytes()).unwrap();
        assert_eq!(cal.len(), 3);
        assert_eq!(cal.first(), NaiveDate::from_ymd_opt(2000, 1, 3).unwrap());
        assert_eq!(cal.last(), NaiveDate::from_ymd_opt(2000, 1, 5).unwrap());
    }

    #[test]
    fn test_from_reader_requires_date_column() {
        let text = "day\n2000-01-05\n";
        assert!(matches!(
            TradingCalendar::from_reader(text.as_bytes()),
            Err(DataError::MissingColumn { .. })
        ));
    }
}
