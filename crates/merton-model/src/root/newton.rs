//! Damped Newton iteration for two equations in two positive unknowns.
//!
//! The Jacobian is approximated by forward differences. Each full Newton step
//! is halved until the trial point stays in the positive quadrant and lowers
//! the sum of squared residuals.

use super::RootFindingError;

const SQRT_EPSILON: f64 = 1.490_116_119_384_765_6e-8;

/// Converged point of a [`NewtonSolver`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonSolution {
    /// Root
    pub x: [f64; 2],
    /// Newton iterations performed
    pub iterations: usize,
    /// Residual max-norm at the root
    pub residual: f64,
}

/// Damped Newton solver over the positive quadrant.
#[derive(Debug, Clone, Copy)]
pub struct NewtonSolver {
    tolerance: f64,
    max_iterations: usize,
    max_halvings: usize,
}

fn max_norm(f: [f64; 2]) -> f64 {
    f[0].abs().max(f[1].abs())
}

fn merit(f: [f64; 2]) -> f64 {
    0.5 * (f[0] * f[0] + f[1] * f[1])
}

fn is_finite(v: [f64; 2]) -> bool {
    v[0].is_finite() && v[1].is_finite()
}

impl NewtonSolver {
    /// Create a solver stopping once the residual max-norm is within
    /// `tolerance`.
    pub const fn new(tolerance: f64, max_iterations: usize, max_halvings: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
            max_halvings,
        }
    }

    fn jacobian<F>(&self, f: &F, x: [f64; 2], fx: [f64; 2]) -> Option<[[f64; 2]; 2]>
    where
        F: Fn([f64; 2]) -> [f64; 2],
    {
        let mut jac = [[0.0; 2]; 2];
        for j in 0..2 {
            let mut shifted = x;
            shifted[j] += SQRT_EPSILON * x[j].abs().max(SQRT_EPSILON);
            let h = shifted[j] - x[j];
            let fs = f(shifted);
            if !is_finite(fs) {
                return None;
            }
            for i in 0..2 {
                jac[i][j] = (fs[i] - fx[i]) / h;
            }
        }
        Some(jac)
    }

    /// Solve `f(x) = 0` starting from `x0`, both components of which must be
    /// positive.
    pub fn solve<F>(&self, f: F, x0: [f64; 2]) -> Result<NewtonSolution, RootFindingError>
    where
        F: Fn([f64; 2]) -> [f64; 2],
    {
        let mut x = x0;
        let mut fx = f(x);
        if !(is_finite(fx) && x[0] > 0.0 && x[1] > 0.0) {
            return Err(RootFindingError::NonFinite { iterations: 0 });
        }

        for iteration in 0..self.max_iterations {
            let residual = max_norm(fx);
            if residual <= self.tolerance {
                return Ok(NewtonSolution {
                    x,
                    iterations: iteration,
                    residual,
                });
            }

            let jac = self
                .jacobian(&f, x, fx)
                .ok_or(RootFindingError::NonFinite {
                    iterations: iteration,
                })?;
            let det = jac[0][0] * jac[1][1] - jac[0][1] * jac[1][0];
            let scale = (jac[0][0] * jac[1][1]).abs() + (jac[0][1] * jac[1][0]).abs();
            if !det.is_finite() || det.abs() <= f64::EPSILON * scale {
                return Err(RootFindingError::SingularJacobian {
                    iterations: iteration,
                    residual,
                });
            }

            let step = [
                -(jac[1][1] * fx[0] - jac[0][1] * fx[1]) / det,
                -(jac[0][0] * fx[1] - jac[1][0] * fx[0]) / det,
            ];

            let current = merit(fx);
            let mut lambda = 1.0;
            let mut accepted = None;
            for _ in 0..=self.max_halvings {
                let trial = [x[0] + lambda * step[0], x[1] + lambda * step[1]];
                if trial[0] > 0.0 && trial[1] > 0.0 {
                    let ft = f(trial);
                    if is_finite(ft) && merit(ft) < current {
                        accepted = Some((trial, ft));
                        break;
                    }
                }
                lambda *= 0.5;
            }

            let Some((next, f_next)) = accepted else {
                return Err(RootFindingError::LineSearchFailed {
                    iterations: iteration + 1,
                    residual,
                });
            };
            x = next;
            fx = f_next;
        }

        let residual = max_norm(fx);
        if residual <= self.tolerance {
            Ok(NewtonSolution {
                x,
                iterations: self.max_iterations,
                residual,
            })
        } else {
            Err(RootFindingError::MaxIterations {
                iterations: self.max_iterations,
                residual,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_solves_nonlinear_system() {
        // x² + y² = 4, x·y = 1 with x > y > 0
        let solver = NewtonSolver::new(1e-12, 50, 30);
        let sol = solver
            .solve(|v| [v[0] * v[0] + v[1] * v[1] - 4.0, v[0] * v[1] - 1.0], [2.0, 0.3])
            .unwrap();
        let (x, y) = (sol.x[0], sol.x[1]);
        assert_abs_diff_eq!(x * x + y * y, 4.0, epsilon = 1e-10);
        assert_abs_diff_eq!(x * y, 1.0, epsilon = 1e-10);
        assert!(sol.residual <= 1e-12);
    }

    #[test]
    fn test_iteration_cap() {
        let solver = NewtonSolver::new(1e-14, 1, 30);
        let result = solver.solve(|v| [v[0].exp() - 5.0, v[1] * v[1] - 3.0], [0.1, 0.1]);
        assert!(matches!(
            result,
            Err(RootFindingError::MaxIterations { iterations: 1, .. })
        ));
    }

    #[test]
    fn test_singular_jacobian() {
        let solver = NewtonSolver::new(1e-12, 50, 30);
        let result = solver.solve(|v| [v[0] - 1.0, 2.0 * v[0] - 3.0], [1.0, 1.0]);
        assert!(matches!(
            result,
            Err(RootFindingError::SingularJacobian { .. })
        ));
    }

    #[test]
    fn test_rejects_invalid_start() {
        let solver = NewtonSolver::new(1e-12, 50, 30);
        assert!(matches!(
            solver.solve(|v| [v[0], v[1]], [-1.0, 1.0]),
            Err(RootFindingError::NonFinite { iterations: 0 })
        ));
    }
}
