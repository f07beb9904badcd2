//! Iterated method.
//!
//! Starting from the initial asset-volatility guess, each iteration
//!
//! 1. inverts the equity-value equation for every day of the window, giving
//!    an implied asset value series under the current σ_V;
//! 2. re-estimates σ_V (and the mean asset return) from that series;
//! 3. stops once |σ_V' − σ_V| is within tolerance.
//!
//! Converged estimates report the σ_V that produced the final implied series
//! and DD = (ln(V/D) + (μ_V − σ_V²/2) T) / (σ_V √T) for the last day.

use super::{Estimate, Method, MertonSolver, SolverError, applicable_inputs};
use crate::config::ModelConfig;
use crate::pricing::{default_probability, distance_to_default, equity_value};
use crate::root::{RootFindingError, brent};
use crate::volatility::{self, annualised_log_returns, annualised_volatility, mean_return};
use crate::window::EvaluationWindow;
use merton_data::ModelInputs;
use tracing::debug;

/// Fixed-point Merton solver.
#[derive(Debug, Clone)]
pub struct IteratedSolver {
    config: ModelConfig,
}

impl IteratedSolver {
    /// Create a solver.
    pub const fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Asset value whose call value equals `inputs.equity` under
    /// `asset_volatility`.
    ///
    /// The root lies in `[E, E + D e^{−r T}]`: the call is worth less than
    /// the underlying and at least its discounted intrinsic value. There is
    /// no implied value for a non-positive or non-finite volatility.
    pub fn implied_asset_value(
        &self,
        inputs: ModelInputs,
        asset_volatility: f64,
    ) -> Result<f64, RootFindingError> {
        let ModelInputs {
            equity,
            debt,
            risk_free,
        } = inputs;
        if !(asset_volatility.is_finite() && asset_volatility > 0.0) {
            return Err(RootFindingError::NonFinite { iterations: 0 });
        }
        let t = self.config.horizon;
        let upper = 1.0 + debt * (-risk_free * t).exp() / equity;

        let ratio = brent(
            |x| equity_value(x * equity, debt, risk_free, asset_volatility, t) / equity - 1.0,
            1.0,
            upper,
            self.config.root.brent_tolerance,
            self.config.root.brent_max_iterations,
        )?;
        Ok(ratio * equity)
    }

    /// Implied asset value for every day of the window; `None` where inputs
    /// are missing or the search fails.
    pub fn implied_asset_values(
        &self,
        window: &EvaluationWindow<'_>,
        asset_volatility: f64,
    ) -> Vec<Option<f64>> {
        window
            .observations()
            .iter()
            .map(|obs| {
                let inputs = obs
                    .model_inputs()
                    .filter(|i| i.equity > 0.0 && i.debt > 0.0)?;
                self.implied_asset_value(inputs, asset_volatility).ok()
            })
            .collect()
    }

    fn converged_estimate(
        &self,
        inputs: ModelInputs,
        last_value: Option<f64>,
        asset_volatility: f64,
        mean_asset_return: f64,
        iteration: usize,
        delta: f64,
    ) -> Estimate {
        let Some(asset_value) = last_value else {
            return Estimate::failed(Some(iteration), Some(delta));
        };
        let dd = distance_to_default(
            asset_value,
            inputs.debt,
            mean_asset_return,
            asset_volatility,
            self.config.horizon,
        );
        if !dd.is_finite() {
            return Estimate::failed(Some(iteration), Some(delta));
        }

        Estimate {
            distance_to_default: Some(dd),
            default_probability: Some(default_probability(dd)),
            asset_value: Some(asset_value),
            asset_volatility: Some(asset_volatility),
            mean_asset_return: Some(mean_asset_return),
            converged: true,
            iterations: Some(iteration),
            converge_check: Some(delta),
        }
    }
}

impl MertonSolver for IteratedSolver {
    fn method(&self) -> Method {
        Method::Iterated
    }

    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn solve(&self, window: &EvaluationWindow<'_>) -> Result<Estimate, SolverError> {
        let inputs = applicable_inputs(window, &self.config)?;
        let vol = volatility::estimate(window, &self.config).ok_or_else(|| {
            SolverError::NotApplicable {
                reason: "no volatility estimate".to_string(),
            }
        })?;
        let days = self.config.trading_days_per_year;

        let mut sigma = vol.initial_asset;
        let mut check = None;
        for iteration in 1..=self.config.max_iter {
            let implied = self.implied_asset_values(window, sigma);
            let present = implied.iter().flatten().count();
            if present < self.config.min_observations {
                debug!(
                    date = %window.date(),
                    iteration,
                    present,
                    "Too few implied asset values"
                );
                continue;
            }

            let returns = annualised_log_returns(implied.iter().copied(), days);
            let (Some(next_sigma), Some(mean)) =
                (annualised_volatility(&returns, days), mean_return(&returns))
            else {
                continue;
            };

            let delta = (next_sigma - sigma).abs();
            check = Some(delta);
            if delta <= self.config.tol {
                let last_value = implied.last().copied().flatten();
                return Ok(self.converged_estimate(inputs, last_value, sigma, mean, iteration, delta));
            }
            sigma = next_sigma;
        }

        debug!(date = %window.date(), "Iterated method did not converge");
        Ok(Estimate::failed(Some(self.config.max_iter), check))
    }
}
