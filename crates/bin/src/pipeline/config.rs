//! Run configuration: JSON file defaults with command-line overrides.

use super::PipelineError;
use merton::EngineConfig;
use merton_data::{DEFAULT_LOOKBACK_DAYS, LagConvention};
use merton_model::ModelConfig;
use serde::Deserialize;
use std::path::Path;

/// Default look-back when the calendar-day convention is chosen without
/// an explicit length.
const DEFAULT_LOOKBACK_CALENDAR_DAYS: i64 = 365;

/// Contents of a `--config` file. Missing sections take their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RunConfig {
    pub(crate) model: ModelConfig,
    pub(crate) engine: EngineConfig,
}

/// Which lag convention the command line asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LagKind {
    TradingDays,
    CalendarDays,
}

impl RunConfig {
    /// Read a config file, or the defaults when no path is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                Ok(serde_json::from_str(&text)?)
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply command-line overrides.
    pub(crate) fn with_overrides(
        mut self,
        threads: Option<usize>,
        lag_kind: Option<LagKind>,
        lag_days: Option<i64>,
    ) -> Self {
        if let Some(threads) = threads {
            self.engine.threads = threads;
        }

        let kind = lag_kind.unwrap_or(match self.model.lag {
            LagConvention::TradingDays(_) => LagKind::TradingDays,
            LagConvention::CalendarDays(_) => LagKind::CalendarDays,
        });
        self.model.lag = match (kind, lag_days, self.model.lag) {
            (LagKind::TradingDays, Some(n), _) => LagConvention::TradingDays(n.max(0) as usize),
            (LagKind::CalendarDays, Some(n), _) => LagConvention::CalendarDays(n),
            (LagKind::TradingDays, None, lag @ LagConvention::TradingDays(_))
            | (LagKind::CalendarDays, None, lag @ LagConvention::CalendarDays(_)) => lag,
            (LagKind::TradingDays, None, _) => LagConvention::TradingDays(DEFAULT_LOOKBACK_DAYS),
            (LagKind::CalendarDays, None, _) => {
                LagConvention::CalendarDays(DEFAULT_LOOKBACK_CALENDAR_DAYS)
            }
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_overrides() {
        let config = RunConfig::default().with_overrides(None, None, None);
        assert_eq!(config.model.lag, LagConvention::TradingDays(250));
        assert_eq!(config.engine.threads, 0);
    }

    #[test]
    fn test_switching_convention_uses_its_default_length() {
        let config = RunConfig::default().with_overrides(Some(2), Some(LagKind::CalendarDays), None);
        assert_eq!(config.model.lag, LagConvention::CalendarDays(365));
        assert_eq!(config.engine.threads, 2);
    }

    #[test]
    fn test_lag_days_keep_file_convention() {
        let file: RunConfig =
            serde_json::from_str(r#"{"model": {"lag": {"CalendarDays": 360}}}"#).unwrap();
        let config = file.with_overrides(None, None, Some(180));
        assert_eq!(config.model.lag, LagConvention::CalendarDays(180));
    }
}
