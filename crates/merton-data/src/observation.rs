//! Firm identities, daily observations and firm groups.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Four-part firm identity used to partition the panel.
///
/// Ordering is lexicographic over `(gvkey, fyr, permco, permno)`, which is
/// also the sort order of the output tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FirmKey {
    /// Fundamentals key (Compustat GVKEY), kept as text to preserve leading zeros.
    pub gvkey: String,
    /// Fiscal-year-end month tag.
    pub fyr: i64,
    /// Permanent company key (CRSP PERMCO).
    pub permco: i64,
    /// Permanent security key (CRSP PERMNO).
    pub permno: i64,
}

impl FirmKey {
    /// Create a new firm key.
    pub fn new(gvkey: impl Into<String>, fyr: i64, permco: i64, permno: i64) -> Self {
        Self {
            gvkey: gvkey.into(),
            fyr,
            permco,
            permno,
        }
    }
}

impl fmt::Display for FirmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gvkey={} fyr={} permco={} permno={}",
            self.gvkey, self.fyr, self.permco, self.permno
        )
    }
}

/// Equity value, face value of debt and risk-free rate for one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelInputs {
    /// Equity market value (E).
    pub equity: f64,
    /// Face value of debt (D).
    pub debt: f64,
    /// Risk-free rate (rf), annualised decimal.
    pub risk_free: f64,
}

/// One firm's daily record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Trading date.
    pub date: NaiveDate,
    /// Total book assets (A).
    pub assets: Option<f64>,
    /// Equity market value (E).
    pub equity: Option<f64>,
    /// Face value of debt (D).
    pub debt: Option<f64>,
    /// Risk-free rate (rf).
    pub risk_free: Option<f64>,
    /// Sector code (GICS sub-industry).
    pub sector: Option<String>,
    /// Country of incorporation code.
    pub country: Option<String>,
    /// Security CUSIP, when the panel carries one.
    pub cusip: Option<String>,
}

impl Observation {
    /// Observation with only the model inputs populated.
    pub const fn new(
        date: NaiveDate,
        equity: Option<f64>,
        debt: Option<f64>,
        risk_free: Option<f64>,
    ) -> Self {
        Self {
            date,
            assets: None,
            equity,
            debt,
            risk_free,
            sector: None,
            country: None,
            cusip: None,
        }
    }

    /// E, D and rf when all three are present.
    pub fn model_inputs(&self) -> Option<ModelInputs> {
        match (self.equity, self.debt, self.risk_free) {
            (Some(equity), Some(debt), Some(risk_free)) => Some(ModelInputs {
                equity,
                debt,
                risk_free,
            }),
            _ => None,
        }
    }

    /// Whether E, D and rf are all present.
    pub fn has_model_inputs(&self) -> bool {
        self.model_inputs().is_some()
    }
}

/// All observations of one firm identity, sorted ascending by date.
#[derive(Debug, Clone, PartialEq)]
pub struct FirmGroup {
    key: FirmKey,
    observations: Vec<Observation>,
}

impl FirmGroup {
    /// Build a group, sorting observations by date.
    ///
    /// When two observations share a date the first one is kept.
    pub fn new(key: FirmKey, mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|obs| obs.date);
        observations.dedup_by_key(|obs| obs.date);
        Self { key, observations }
    }

    /// The group's firm identity.
    pub const fn key(&self) -> &FirmKey {
        &self.key
    }

    /// Observations in ascending date order.
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the group has no observations.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// First and last observation dates.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.observations.first()?.date, self.observations.last()?.date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2001, 3, d).unwrap()
    }

    #[test]
    fn test_model_inputs_require_all_three() {
        let full = Observation::new(day(1), Some(10.0), Some(5.0), Some(0.03));
        assert!(full.has_model_inputs());

        let missing_rf = Observation::new(day(1), Some(10.0), Some(5.0), None);
        assert!(missing_rf.model_inputs().is_none());
    }

    #[test]
    fn test_group_sorts_and_dedups_dates() {
        let key = FirmKey::new("001004", 5, 20000, 54594);
        let group = FirmGroup::new(
            key,
            vec![
                Observation::new(day(3), Some(3.0), Some(1.0), Some(0.01)),
                Observation::new(day(1), Some(1.0), Some(1.0), Some(0.01)),
                Observation::new(day(3), Some(99.0), Some(1.0), Some(0.01)),
                Observation::new(day(2), Some(2.0), Some(1.0), Some(0.01)),
            ],
        );

        let dates: Vec<_> = group.observations().iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![day(1), day(2), day(3)]);
        assert_eq!(group.observations()[2].equity, Some(3.0));
        assert_eq!(group.date_range(), Some((day(1), day(3))));
    }

    #[test]
    fn test_firm_key_ordering() {
        let a = FirmKey::new("001004", 5, 20000, 54594);
        let b = FirmKey::new("001004", 12, 1, 1);
        let c = FirmKey::new("001005", 1, 1, 1);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a.to_string(), "gvkey=001004 fyr=5 permco=20000 permno=54594");
    }
}
