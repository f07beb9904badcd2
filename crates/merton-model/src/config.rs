//! Model configuration.

use merton_data::LagConvention;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors for invalid model configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A parameter that must be strictly positive was not
    #[error("Parameter '{name}' must be positive, got {value}")]
    NonPositive {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: f64,
    },

    /// Minimum observations too small to estimate a volatility
    #[error("min_observations must be at least 3, got {0}")]
    TooFewObservations(usize),

    /// Iteration cap of zero
    #[error("Iteration cap '{0}' must be at least 1")]
    ZeroIterations(&'static str),
}

/// Root-finder tolerances and iteration caps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootConfig {
    /// Absolute tolerance on V for the per-day Brent search (default: 1e-10)
    pub brent_tolerance: f64,
    /// Iteration cap of the Brent search (default: 100)
    pub brent_max_iterations: usize,
    /// Max-norm tolerance on the scaled residuals of the 2-D solve (default: 1e-10)
    pub newton_tolerance: f64,
    /// Iteration cap of the 2-D solve (default: 100)
    pub newton_max_iterations: usize,
    /// Step halvings allowed per Newton iteration (default: 40)
    pub max_step_halvings: usize,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            brent_tolerance: 1e-10,
            brent_max_iterations: 100,
            newton_tolerance: 1e-10,
            newton_max_iterations: 100,
            max_step_halvings: 40,
        }
    }
}

/// Merton model configuration shared by both solution methods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Debt maturity T in years (default: 1.0)
    pub horizon: f64,

    /// Minimum observations in an evaluation window (default: 50).
    /// Also the minimum number of implied values the iterated method needs
    /// to re-estimate asset volatility.
    pub min_observations: usize,

    /// Look-back used to cut the evaluation window (default: 250 trading days)
    pub lag: LagConvention,

    /// Annualisation factor for daily returns (default: 252)
    pub trading_days_per_year: f64,

    /// Lower bound for equity volatility and the initial asset volatility (default: 0.01)
    pub vol_floor: f64,

    /// Outer iteration cap of the iterated method (default: 10)
    pub max_iter: usize,

    /// Convergence tolerance on |Δσ_V| for the iterated method (default: 1e-4)
    pub tol: f64,

    /// Root-finder settings
    pub root: RootConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            horizon: 1.0,
            min_observations: 50,
            lag: LagConvention::default(),
            trading_days_per_year: 252.0,
            vol_floor: 0.01,
            max_iter: 10,
            tol: 1e-4,
            root: RootConfig::default(),
        }
    }
}

impl ModelConfig {
    /// Check every parameter is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("horizon", self.horizon),
            ("trading_days_per_year", self.trading_days_per_year),
            ("vol_floor", self.vol_floor),
            ("tol", self.tol),
            ("root.brent_tolerance", self.root.brent_tolerance),
            ("root.newton_tolerance", self.root.newton_tolerance),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }

        if self.min_observations < 3 {
            return Err(ConfigError::TooFewObservations(self.min_observations));
        }
        if self.max_iter == 0 {
            return Err(ConfigError::ZeroIterations("max_iter"));
        }
        if self.root.brent_max_iterations == 0 {
            return Err(ConfigError::ZeroIterations("root.brent_max_iterations"));
        }
        if self.root.newton_max_iterations == 0 {
            return Err(ConfigError::ZeroIterations("root.newton_max_iterations"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ModelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_observations, 50);
        assert_eq!(config.max_iter, 10);
        assert_eq!(config.lag, LagConvention::TradingDays(250));
    }

    #[test]
    fn test_rejects_non_positive_floor() {
        let config = ModelConfig {
            vol_floor: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive { name: "vol_floor", .. })
        ));
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: ModelConfig =
            serde_json::from_str(r#"{"max_iter": 25, "lag": {"CalendarDays": 365}}"#).unwrap();
        assert_eq!(config.max_iter, 25);
        assert_eq!(config.lag, LagConvention::CalendarDays(365));
        assert_eq!(config.min_observations, 50);
    }
}
