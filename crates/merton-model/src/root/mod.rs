//! Root finders used by the solvers.
//!
//! - [`brent`]: bracketed one-dimensional search (per-day implied asset value)
//! - [`NewtonSolver`]: damped two-dimensional Newton iteration on a
//!   forward-difference Jacobian (simultaneous solve)

mod newton;

pub use newton::{NewtonSolution, NewtonSolver};

use roots::{SearchError, SimpleConvergency, find_root_brent};
use thiserror::Error;

/// Why a root search gave up.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RootFindingError {
    /// The function has the same sign at both ends of the bracket
    #[error("Root not bracketed by [{lower}, {upper}]")]
    NoBracket {
        /// Lower end of the bracket
        lower: f64,
        /// Upper end of the bracket
        upper: f64,
    },

    /// Iteration cap reached before the tolerance was met
    #[error("No convergence after {iterations} iterations (residual {residual:e})")]
    MaxIterations {
        /// Iterations performed
        iterations: usize,
        /// Residual max-norm at the last iterate (NaN when unknown)
        residual: f64,
    },

    /// A function value or iterate was NaN or infinite
    #[error("Non-finite value at iteration {iterations}")]
    NonFinite {
        /// Iterations performed
        iterations: usize,
    },

    /// The Jacobian could not be inverted
    #[error("Singular Jacobian at iteration {iterations}")]
    SingularJacobian {
        /// Iterations performed
        iterations: usize,
        /// Residual max-norm at the last iterate
        residual: f64,
    },

    /// No step length reduced the residual
    #[error("Line search failed at iteration {iterations} (residual {residual:e})")]
    LineSearchFailed {
        /// Iterations performed
        iterations: usize,
        /// Residual max-norm at the last iterate
        residual: f64,
    },
}

impl RootFindingError {
    /// Iterations performed before the failure, when known.
    pub const fn iterations(&self) -> Option<usize> {
        match self {
            Self::NoBracket { .. } => None,
            Self::MaxIterations { iterations, .. }
            | Self::NonFinite { iterations }
            | Self::SingularJacobian { iterations, .. }
            | Self::LineSearchFailed { iterations, .. } => Some(*iterations),
        }
    }

    /// Residual max-norm at the last iterate, when known.
    pub fn residual(&self) -> Option<f64> {
        match self {
            Self::MaxIterations { residual, .. }
            | Self::SingularJacobian { residual, .. }
            | Self::LineSearchFailed { residual, .. } => Some(*residual).filter(|r| r.is_finite()),
            Self::NoBracket { .. } | Self::NonFinite { .. } => None,
        }
    }
}

/// Find a root of `f` in `[lower, upper]` with Brent's method.
///
/// An end point whose value is already zero within `tolerance` is returned
/// as is.
pub fn brent<F>(
    f: F,
    lower: f64,
    upper: f64,
    tolerance: f64,
    max_iterations: usize,
) -> Result<f64, RootFindingError>
where
    F: Fn(f64) -> f64,
{
    let (f_lower, f_upper) = (f(lower), f(upper));
    if !(f_lower.is_finite() && f_upper.is_finite()) {
        return Err(RootFindingError::NonFinite { iterations: 0 });
    }
    if f_lower.abs() <= tolerance {
        return Ok(lower);
    }
    if f_upper.abs() <= tolerance {
        return Ok(upper);
    }
    if f_lower.signum() == f_upper.signum() {
        return Err(RootFindingError::NoBracket { lower, upper });
    }

    let mut convergency = SimpleConvergency {
        eps: tolerance,
        max_iter: max_iterations,
    };
    match find_root_brent(lower, upper, &f, &mut convergency) {
        Ok(root) if root.is_finite() => Ok(root),
        Ok(_) => Err(RootFindingError::NonFinite {
            iterations: max_iterations,
        }),
        Err(SearchError::NoBracketing) => Err(RootFindingError::NoBracket { lower, upper }),
        Err(_) => Err(RootFindingError::MaxIterations {
            iterations: max_iterations,
            residual: f64::NAN,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_brent_finds_sqrt_two() {
        let root = brent(|x| x * x - 2.0, 0.0, 2.0, 1e-12, 100).unwrap();
        assert_abs_diff_eq!(root, 2.0_f64.sqrt(), epsilon = 1e-10);
    }

    #[test]
    fn test_brent_requires_bracket() {
        assert!(matches!(
            brent(|x| x * x + 1.0, -1.0, 1.0, 1e-12, 100),
            Err(RootFindingError::NoBracket { .. })
        ));
    }

    #[test]
    fn test_brent_accepts_root_at_end_point() {
        let root = brent(|x| x - 3.0, 0.0, 3.0, 1e-12, 100).unwrap();
        assert_eq!(root, 3.0);
    }

    #[test]
    fn test_error_accessors() {
        let err = RootFindingError::MaxIterations {
            iterations: 7,
            residual: 0.5,
        };
        assert_eq!(err.iterations(), Some(7));
        assert_eq!(err.residual(), Some(0.5));
        assert_eq!(
            RootFindingError::NoBracket {
                lower: 0.0,
                upper: 1.0
            }
            .iterations(),
            None
        );
    }
}
