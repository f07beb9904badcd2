//! Simultaneous method: solve the equity-value and equity-volatility
//! equations for (V, σ_V) at the evaluation date.
//!
//! E   = V Φ(d1) − e^{−r T} D Φ(d2)
//! E σ_E = V Φ(d1) σ_V
//!
//! Both equations are divided by E and V is solved for as a multiple of E,
//! so the reported residual is relative to equity value.

use super::{Estimate, Method, MertonSolver, SolverError, applicable_inputs};
use crate::config::ModelConfig;
use crate::pricing::{d1_d2, default_probability, distance_to_default, equity_value, norm_cdf};
use crate::root::{NewtonSolution, NewtonSolver, RootFindingError};
use crate::volatility;
use crate::window::EvaluationWindow;
use merton_data::ModelInputs;
use tracing::debug;

/// Two-equation Merton solve.
#[derive(Debug, Clone)]
pub struct SimultaneousSolver {
    config: ModelConfig,
}

impl SimultaneousSolver {
    /// Create a solver.
    pub const fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Solve for (V, σ_V) given equity volatility and a starting σ_V.
    pub fn solve_system(
        &self,
        inputs: ModelInputs,
        equity_volatility: f64,
        initial_asset_volatility: f64,
    ) -> Result<NewtonSolution, RootFindingError> {
        let ModelInputs {
            equity,
            debt,
            risk_free,
        } = inputs;
        let t = self.config.horizon;

        let residuals = |x: [f64; 2]| {
            let (v, sigma) = (x[0] * equity, x[1]);
            let (d1, _) = d1_d2(v, debt, risk_free, sigma, t);
            [
                equity_value(v, debt, risk_free, sigma, t) / equity - 1.0,
                x[0] * norm_cdf(d1) * sigma - equity_volatility,
            ]
        };

        let root = &self.config.root;
        let newton = NewtonSolver::new(
            root.newton_tolerance,
            root.newton_max_iterations,
            root.max_step_halvings,
        );
        let mut solution = newton.solve(residuals, [(equity + debt) / equity, initial_asset_volatility])?;
        solution.x[0] *= equity;
        Ok(solution)
    }
}

impl MertonSolver for SimultaneousSolver {
    fn method(&self) -> Method {
        Method::Simultaneous
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

        let solution = match self.solve_system(inputs, vol.equity, vol.initial_asset) {
            Ok(solution) => solution,
            Err(e) => {
                debug!(date = %window.date(), error = %e, "Simultaneous solve failed");
                return Ok(Estimate::failed(e.iterations(), e.residual()));
            }
        };

        let [asset_value, asset_volatility] = solution.x;
        let dd = distance_to_default(
            asset_value,
            inputs.debt,
            inputs.risk_free,
            asset_volatility,
            self.config.horizon,
        );
        if !dd.is_finite() {
            debug!(date = %window.date(), dd, "Non-finite distance to default");
            return Ok(Estimate::failed(
                Some(solution.iterations),
                Some(solution.residual),
            ));
        }

        Ok(Estimate {
            distance_to_default: Some(dd),
            default_probability: Some(default_probability(dd)),
            asset_value: Some(asset_value),
            asset_volatility: Some(asset_volatility),
            mean_asset_return: None,
            converged: true,
            iterations: Some(solution.iterations),
            converge_check: Some(solution.residual),
        })
    }
}
