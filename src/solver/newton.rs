use nalgebra::{DMatrix, DVector};

use super::{parameter_jacobian, state_jacobian, ResidualSystem, SolverError, SteadySolution};
use crate::error::SteadySolError;

const MAX_ITERATIONS: usize = 50;
const TOLERANCE: f64 = 1e-10;
const MIN_DAMPING: f64 = 1.0 / 1024.0;

/// Damped Newton iteration on a residual system.
///
/// Each iteration factorizes the forward-AD state Jacobian once and halves
/// the step while it fails to reduce the residual norm, so evaluations at
/// poor candidates (degenerate or negative amounts) cannot run the iterate
/// off to non-finite territory.
#[derive(Debug, Clone)]
pub struct NewtonSolver {
    max_iterations: usize,
    tolerance: f64,
}

impl Default for NewtonSolver {
    fn default() -> Self {
        NewtonSolver {
            max_iterations: MAX_ITERATIONS,
            tolerance: TOLERANCE,
        }
    }
}

impl NewtonSolver {
    /// Create a solver with the given iteration budget and residual tolerance.
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        NewtonSolver {
            max_iterations,
            tolerance,
        }
    }

    /// Get the convergence tolerance on the residual norm
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Iterate from `x0` until the residual norm drops below tolerance.
    pub fn solve<R: ResidualSystem>(
        &self,
        system: &R,
        x0: &[f64],
        y: &[f64],
        rdata: &[f64],
        idata: &[i32],
    ) -> Result<SteadySolution, SteadySolError> {
        let mut x = DVector::from_column_slice(x0);
        let mut residual: Vec<f64> = system.evaluate(x.as_slice(), y, rdata, idata)?;
        let mut norm = norm2(&residual);

        for iteration in 0..self.max_iterations {
            if norm <= self.tolerance {
                tracing::debug!(iteration, residual_norm = norm, "steady state converged");
                return Ok(SteadySolution {
                    state: x,
                    iterations: iteration,
                    residual_norm: norm,
                });
            }

            let jac = state_jacobian(system, x.as_slice(), y, rdata, idata)?;
            let rhs = -DVector::from_column_slice(&residual);
            let step = jac
                .lu()
                .solve(&rhs)
                .ok_or(SolverError::SingularJacobian { iteration })?;

            let mut alpha = 1.0;
            loop {
                let trial = &x + &step * alpha;
                let trial_residual: Vec<f64> =
                    system.evaluate(trial.as_slice(), y, rdata, idata)?;
                let trial_norm = norm2(&trial_residual);
                if trial_norm.is_finite() && (trial_norm < norm || alpha <= MIN_DAMPING) {
                    x = trial;
                    residual = trial_residual;
                    norm = trial_norm;
                    break;
                }
                alpha *= 0.5;
                if alpha < MIN_DAMPING {
                    return Err(SolverError::DidNotConverge {
                        iterations: iteration + 1,
                        residual_norm: norm,
                    }
                    .into());
                }
            }
        }

        if norm <= self.tolerance {
            return Ok(SteadySolution {
                state: x,
                iterations: self.max_iterations,
                residual_norm: norm,
            });
        }
        Err(SolverError::DidNotConverge {
            iterations: self.max_iterations,
            residual_norm: norm,
        }
        .into())
    }

    /// Solve, then propagate sensitivities of the root through the implicit
    /// function theorem: `d x*/d y = -(dr/dx)^-1 (dr/dy)` evaluated at the
    /// root. One LU factorization serves every parameter direction.
    pub fn solve_with_sensitivity<R: ResidualSystem>(
        &self,
        system: &R,
        x0: &[f64],
        y: &[f64],
        rdata: &[f64],
        idata: &[i32],
    ) -> Result<(SteadySolution, DMatrix<f64>), SteadySolError> {
        let solution = self.solve(system, x0, y, rdata, idata)?;
        let jx = state_jacobian(system, solution.state.as_slice(), y, rdata, idata)?;
        let jy = parameter_jacobian(system, solution.state.as_slice(), y, rdata, idata)?;
        let sensitivities = jx
            .lu()
            .solve(&(-jy))
            .ok_or(SolverError::SingularJacobian {
                iteration: solution.iterations,
            })?;
        Ok((solution, sensitivities))
    }
}

fn norm2(v: &[f64]) -> f64 {
    v.iter().map(|&r| r * r).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Scalar;
    use approx::assert_relative_eq;

    /// r(x) = x^2 - y[0], root at sqrt(y[0]).
    struct SquareRoot;

    impl ResidualSystem for SquareRoot {
        fn evaluate<T0, T1, S>(
            &self,
            x: &[T0],
            y: &[T1],
            _rdata: &[f64],
            _idata: &[i32],
        ) -> Result<Vec<S>, SteadySolError>
        where
            T0: Scalar,
            T1: Scalar,
            S: Scalar + From<T0> + From<T1>,
        {
            let x0 = S::from(x[0]);
            let y0 = S::from(y[0]);
            Ok(vec![x0 * x0 - y0])
        }
    }

    #[test]
    fn converges_on_scalar_nonlinear_root() {
        let solver = NewtonSolver::default();
        let solution = solver.solve(&SquareRoot, &[1.0], &[2.0], &[], &[]).unwrap();
        assert_relative_eq!(solution.state()[0], 2.0f64.sqrt(), epsilon = 1e-9);
        assert!(solution.residual_norm() <= solver.tolerance());
    }

    #[test]
    fn implicit_sensitivity_matches_closed_form() {
        // x* = sqrt(y), so dx*/dy = 1 / (2 sqrt(y)).
        let solver = NewtonSolver::default();
        let (solution, sens) = solver
            .solve_with_sensitivity(&SquareRoot, &[1.0], &[2.0], &[], &[])
            .unwrap();
        assert_relative_eq!(
            sens[(0, 0)],
            0.5 / solution.state()[0],
            max_relative = 1e-8
        );
    }

    #[test]
    fn reports_non_convergence() {
        // No real root: x^2 + 1 = 0 when y[0] = -1.
        let solver = NewtonSolver::new(10, 1e-12);
        let res = solver.solve(&SquareRoot, &[3.0], &[-1.0], &[], &[]);
        assert!(matches!(res, Err(SteadySolError::Solver(_))));
    }
}
