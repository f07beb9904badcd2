//! Equity volatility and the initial asset-volatility guess.
//!
//! Annualised daily log returns r_t = ln(E_t / E_{t−1}) · N are taken over
//! consecutive observations that both carry E, and
//!
//! σ_E = std(r_t / N) · √N          (sample std, ddof = 1)
//! σ_V0 = σ_E · E_last / (E_last + D_last)
//!
//! with N trading days per year. Both are floored.

use crate::config::ModelConfig;
use crate::window::EvaluationWindow;
use ndarray::Array1;

/// Volatility estimates from one evaluation window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityEstimate {
    /// Annualised equity volatility σ_E
    pub equity: f64,
    /// Initial asset volatility σ_V0
    pub initial_asset: f64,
}

/// Annualised log returns of consecutive pairs of present values.
pub fn annualised_log_returns(
    values: impl IntoIterator<Item = Option<f64>>,
    trading_days_per_year: f64,
) -> Array1<f64> {
    let mut returns = Vec::new();
    let mut previous: Option<f64> = None;
    for value in values {
        if let (Some(prev), Some(curr)) = (previous, value) {
            returns.push((curr / prev).ln() * trading_days_per_year);
        }
        previous = value;
    }
    Array1::from(returns)
}

/// Annualised volatility of annualised log returns, `None` with fewer than
/// two returns.
pub fn annualised_volatility(returns: &Array1<f64>, trading_days_per_year: f64) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }
    let daily = returns / trading_days_per_year;
    Some(daily.std(1.0) * trading_days_per_year.sqrt())
}

/// Mean of annualised log returns, `None` when there are none.
pub fn mean_return(returns: &Array1<f64>) -> Option<f64> {
    returns.mean()
}

fn floored(value: Option<f64>, floor: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() && v >= floor => v,
        _ => floor,
    }
}

/// Estimate σ_E and σ_V0 for a window.
///
/// Returns `None` when the last observation lacks E or D.
pub fn estimate(window: &EvaluationWindow<'_>, config: &ModelConfig) -> Option<VolatilityEstimate> {
    let last = window.last()?;
    let (equity_last, debt_last) = (last.equity?, last.debt?);

    let returns = annualised_log_returns(
        window.observations().iter().map(|o| o.equity),
        config.trading_days_per_year,
    );
    let equity = floored(
        annualised_volatility(&returns, config.trading_days_per_year),
        config.vol_floor,
    );
    let initial_asset = floored(
        Some(equity * equity_last / (equity_last + debt_last)),
        config.vol_floor,
    );

    Some(VolatilityEstimate {
        equity,
        initial_asset,
    })
}
