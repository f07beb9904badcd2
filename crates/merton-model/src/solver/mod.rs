//! Merton solvers.
//!
//! Both methods take an [`EvaluationWindow`] and return an [`Estimate`] for
//! its last day. A window the model cannot be applied to is answered with
//! [`SolverError::NotApplicable`]; numerical failure is not an error but an
//! estimate with `converged == false`.

mod iterated;
mod simultaneous;

pub use iterated::IteratedSolver;
pub use simultaneous::SimultaneousSolver;

use crate::config::ModelConfig;
use crate::window::EvaluationWindow;
use chrono::NaiveDate;
use merton_data::{FirmKey, ModelInputs, Observation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors for windows the model cannot be applied to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    /// The window fails an input precondition
    #[error("Not applicable: {reason}")]
    NotApplicable {
        /// Which precondition failed
        reason: String,
    },
}

/// Solution method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Two-equation solve at the evaluation date
    Simultaneous,
    /// Fixed point between implied asset values and asset volatility
    Iterated,
}

impl Method {
    /// Both methods, in output order.
    pub const ALL: [Self; 2] = [Self::Simultaneous, Self::Iterated];

    /// Lower-case method name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Simultaneous => "simultaneous",
            Self::Iterated => "iterated",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simultaneous" => Ok(Self::Simultaneous),
            "iterated" => Ok(Self::Iterated),
            other => Err(format!("unknown method '{}'", other)),
        }
    }
}

/// Model outputs for one evaluation date. Undefined values are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Estimate {
    /// Distance to default
    pub distance_to_default: Option<f64>,
    /// Probability of default, Φ(−DD)
    pub default_probability: Option<f64>,
    /// Asset value V
    pub asset_value: Option<f64>,
    /// Asset volatility σ_V
    pub asset_volatility: Option<f64>,
    /// Mean annualised asset log return (iterated method only)
    pub mean_asset_return: Option<f64>,
    /// Whether the method converged
    pub converged: bool,
    /// Root-finder iterations (simultaneous) or outer iterations (iterated)
    pub iterations: Option<usize>,
    /// Final residual max-norm (simultaneous) or last |Δσ_V| (iterated)
    pub converge_check: Option<f64>,
}

impl Estimate {
    /// Non-converged estimate carrying only diagnostics.
    pub const fn failed(iterations: Option<usize>, converge_check: Option<f64>) -> Self {
        Self {
            distance_to_default: None,
            default_probability: None,
            asset_value: None,
            asset_volatility: None,
            mean_asset_return: None,
            converged: false,
            iterations,
            converge_check,
        }
    }
}

/// One row of a result table: firm identity, inputs at the evaluation date
/// and the estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverResult {
    /// Firm identity
    pub key: FirmKey,
    /// Evaluation date
    pub date: NaiveDate,
    /// Sector code
    pub sector: Option<String>,
    /// Country code
    pub country: Option<String>,
    /// Security CUSIP
    pub cusip: Option<String>,
    /// Book assets at the evaluation date
    pub assets: Option<f64>,
    /// E, D and rf at the evaluation date
    pub inputs: ModelInputs,
    /// Model outputs
    pub estimate: Estimate,
    /// Wall-clock solve time in seconds
    pub elapsed_secs: f64,
}

impl SolverResult {
    /// Assemble a row from the evaluation-date observation.
    pub fn new(
        key: &FirmKey,
        last: &Observation,
        inputs: ModelInputs,
        estimate: Estimate,
        elapsed_secs: f64,
    ) -> Self {
        Self {
            key: key.clone(),
            date: last.date,
            sector: last.sector.clone(),
            country: last.country.clone(),
            cusip: last.cusip.clone(),
            assets: last.assets,
            inputs,
            estimate,
            elapsed_secs,
        }
    }
}

/// A method for estimating DD and PD from an evaluation window.
pub trait MertonSolver: Send + Sync {
    /// Method implemented.
    fn method(&self) -> Method;

    /// Model configuration in use.
    fn config(&self) -> &ModelConfig;

    /// Estimate the window's last day.
    ///
    /// # Errors
    /// [`SolverError::NotApplicable`] when the window is too short or the
    /// last day's inputs are missing or degenerate.
    fn solve(&self, window: &EvaluationWindow<'_>) -> Result<Estimate, SolverError>;
}

/// Check the preconditions shared by both methods and return the last day's
/// inputs.
pub(crate) fn applicable_inputs(
    window: &EvaluationWindow<'_>,
    config: &ModelConfig,
) -> Result<ModelInputs, SolverError> {
    if window.len() < config.min_observations {
        return Err(SolverError::NotApplicable {
            reason: format!(
                "window has {} observations, need {}",
                window.len(),
                config.min_observations
            ),
        });
    }
    let inputs = window.last_inputs().ok_or_else(|| SolverError::NotApplicable {
        reason: "missing E, D or rf on the evaluation date".to_string(),
    })?;
    if !(inputs.debt.is_finite() && inputs.debt > 0.0) {
        return Err(SolverError::NotApplicable {
            reason: format!("face value of debt is {}", inputs.debt),
        });
    }
    if !(inputs.equity.is_finite() && inputs.equity > 0.0) {
        return Err(SolverError::NotApplicable {
            reason: format!("equity value is {}", inputs.equity),
        });
    }
    Ok(inputs)
}

/// Build the solver for a method.
pub fn solver_for(method: Method, config: ModelConfig) -> Box<dyn MertonSolver> {
    match method {
        Method::Simultaneous => Box::new(SimultaneousSolver::new(config)),
        Method::Iterated => Box::new(IteratedSolver::new(config)),
    }
}
