//! Panel loading: read the pipe-separated daily panel, filter unusable rows
//! and partition it into firm groups.
//!
//! Value columns are accepted under their model names (`A`, `E`, `D`, `rf`)
//! or under the names produced by the upstream data build (`assets`,
//! `mkt_cap`, `face_value_debt`, `tyd01y`). Empty fields are missing values.

use crate::calendar::TradingCalendar;
use crate::error::{DataError, Result};
use crate::observation::{FirmGroup, FirmKey, Observation};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, de};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Required columns, each with the header spellings that satisfy it.
const REQUIRED_COLUMNS: &[&[&str]] = &[
    &["gvkey"],
    &["fyr"],
    &["permco"],
    &["permno"],
    &["date"],
    &["A", "assets"],
    &["E", "mkt_cap"],
    &["D", "face_value_debt"],
    &["rf", "tyd01y"],
];

/// Raw panel row as it appears in the file.
#[derive(Debug, Deserialize)]
struct PanelRow {
    gvkey: String,
    #[serde(deserialize_with = "de_integral")]
    fyr: i64,
    #[serde(deserialize_with = "de_integral")]
    permco: i64,
    #[serde(deserialize_with = "de_integral")]
    permno: i64,
    #[serde(deserialize_with = "de_date")]
    date: NaiveDate,
    #[serde(rename = "A", alias = "assets", default, deserialize_with = "de_value")]
    assets: Option<f64>,
    #[serde(rename = "E", alias = "mkt_cap", default, deserialize_with = "de_value")]
    equity: Option<f64>,
    #[serde(rename = "D", alias = "face_value_debt", default, deserialize_with = "de_value")]
    debt: Option<f64>,
    #[serde(rename = "rf", alias = "tyd01y", default, deserialize_with = "de_value")]
    risk_free: Option<f64>,
    #[serde(default, deserialize_with = "de_text")]
    gsubind: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    fic: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    cusip: Option<String>,
}

/// Parse a `YYYY-MM-DD` date, tolerating a trailing time component.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .ok()
}

fn parse_integral(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        let value = raw.parse::<f64>().ok()?;
        (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
    })
}

fn is_missing(raw: &str) -> bool {
    matches!(raw, "" | "NaN" | "nan" | "NA" | "." | "null" | "None")
}

fn de_integral<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<i64, D::Error> {
    let raw = String::deserialize(d)?;
    parse_integral(&raw).ok_or_else(|| de::Error::custom(format!("not an integer: '{}'", raw)))
}

fn de_date<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<NaiveDate, D::Error> {
    let raw = String::deserialize(d)?;
    parse_date(&raw).ok_or_else(|| de::Error::custom(format!("not a date: '{}'", raw)))
}

fn de_value<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f64>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    match raw.as_deref().map(str::trim) {
        None => Ok(None),
        Some(s) if is_missing(s) => Ok(None),
        Some(s) => {
            let value = s
                .parse::<f64>()
                .map_err(|_| de::Error::custom(format!("not a number: '{}'", s)))?;
            Ok(value.is_finite().then_some(value))
        }
    }
}

fn de_text<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !is_missing(s)))
}

/// Row counts from loading and filtering the panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Data rows read from the file.
    pub rows_read: usize,
    /// Rows dropped because equity value was missing.
    pub dropped_missing_equity: usize,
    /// Rows dropped because E, D or rf was exactly zero.
    pub dropped_zero_inputs: usize,
    /// Rows discarded as duplicates of an earlier firm-date key.
    pub duplicate_keys: usize,
    /// Rows kept.
    pub rows_kept: usize,
}

/// The filtered panel, partitioned into firm groups in key order.
#[derive(Debug, Clone)]
pub struct Panel {
    groups: Vec<FirmGroup>,
    stats: LoadStats,
}

impl Panel {
    /// Load a panel file.
    ///
    /// # Errors
    /// Fails on IO errors, a missing required column or an unparsable row.
    pub fn from_path(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "Reading panel");
        Self::from_reader(File::open(path)?)
    }

    /// Load a panel from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'|')
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        for spellings in REQUIRED_COLUMNS {
            if !spellings.iter().any(|name| headers.iter().any(|h| h == *name)) {
                return Err(DataError::MissingColumn {
                    column: spellings.join(" | "),
                    source_name: "panel".to_string(),
                });
            }
        }

        let mut rows = Vec::new();
        for result in rdr.deserialize::<PanelRow>() {
            let row = result.map_err(|e| match e.position() {
                Some(pos) => DataError::Parse {
                    line: pos.line(),
                    reason: e.to_string(),
                },
                None => DataError::Csv(e),
            })?;
            rows.push(row);
        }

        Ok(Self::from_rows(rows))
    }

    /// Build a panel from already-keyed observations, applying the same
    /// filters as file loading.
    pub fn from_observations(rows: Vec<(FirmKey, Observation)>) -> Self {
        let mut stats = LoadStats {
            rows_read: rows.len(),
            ..LoadStats::default()
        };
        let mut by_key: BTreeMap<FirmKey, Vec<Observation>> = BTreeMap::new();

        for (key, obs) in rows {
            if obs.equity.is_none() {
                stats.dropped_missing_equity += 1;
                continue;
            }
            if [obs.equity, obs.debt, obs.risk_free].contains(&Some(0.0)) {
                stats.dropped_zero_inputs += 1;
                continue;
            }
            by_key.entry(key).or_default().push(obs);
        }

        let groups: Vec<FirmGroup> = by_key
            .into_iter()
            .map(|(key, observations)| {
                let before = observations.len();
                let group = FirmGroup::new(key, observations);
                stats.duplicate_keys += before - group.len();
                group
            })
            .collect();

        stats.rows_kept = groups.iter().map(FirmGroup::len).sum();

        if stats.duplicate_keys > 0 {
            warn!(
                duplicates = stats.duplicate_keys,
                "Duplicated firm-date keys found; keeping the first occurrence"
            );
        }
        info!(
            rows_read = stats.rows_read,
            dropped_missing_equity = stats.dropped_missing_equity,
            dropped_zero_inputs = stats.dropped_zero_inputs,
            rows_kept = stats.rows_kept,
            groups = groups.len(),
            "Panel prepared"
        );

        Self { groups, stats }
    }

    fn from_rows(rows: Vec<PanelRow>) -> Self {
        Self::from_observations(
            rows.into_iter()
                .map(|row| {
                    let key = FirmKey::new(row.gvkey.trim(), row.fyr, row.permco, row.permno);
                    let obs = Observation {
                        date: row.date,
                        assets: row.assets,
                        equity: row.equity,
                        debt: row.debt,
                        risk_free: row.risk_free,
                        sector: row.gsubind,
                        country: row.fic,
                        cusip: row.cusip,
                    };
                    (key, obs)
                })
                .collect(),
        )
    }

    /// Firm groups in ascending key order.
    pub fn groups(&self) -> &[FirmGroup] {
        &self.groups
    }

    /// Consume the panel, returning its groups.
    pub fn into_groups(self) -> Vec<FirmGroup> {
        self.groups
    }

    /// Load and filter statistics.
    pub const fn stats(&self) -> &LoadStats {
        &self.stats
    }

    /// Whether no usable observation survived filtering.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Earliest and latest observation date across all groups.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.groups
            .iter()
            .filter_map(FirmGroup::date_range)
            .reduce(|(lo, hi), (a, b)| (lo.min(a), hi.max(b)))
    }

    /// Build a trading calendar from the union of all observation dates.
    ///
    /// For use when no external calendar is available; gaps common to every
    /// firm are then invisible to the lag lookup.
    pub fn derive_calendar(&self) -> Result<TradingCalendar> {
        let dates = self
            .groups
            .iter()
            .flat_map(|g| g.observations().iter().map(|o| o.date))
            .collect();
        TradingCalendar::new(dates)
    }
}
