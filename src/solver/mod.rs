mod newton;
mod sensitivity;

pub use newton::NewtonSolver;
pub(crate) use sensitivity::{parameter_jacobian, state_jacobian};

use nalgebra::DVector;
use thiserror::Error;

use crate::error::SteadySolError;
use crate::model::Scalar;

/// Errors raised by the nonlinear root solve.
#[derive(Error, Debug, Clone)]
pub enum SolverError {
    /// The state Jacobian could not be factorized
    #[error("singular state Jacobian at iteration {iteration}")]
    SingularJacobian { iteration: usize },

    /// The iteration budget ran out above tolerance
    #[error("root solve did not converge within {iterations} iterations (residual norm {residual_norm:.3e})")]
    DidNotConverge {
        iterations: usize,
        residual_norm: f64,
    },
}

/// The residual function a root solver drives to zero.
///
/// Implementations are immutable configuration plus pure evaluation: they
/// carry no solver state, may be re-evaluated at arbitrary candidate states
/// away from the eventual root (including zero or negative compartment
/// amounts) and must then return a possibly large residual rather than fail.
///
/// `x` is the candidate pre-dose state, `y` the differentiable parameter
/// vector, `rdata`/`idata` fixed side data. The output scalar `S` is the
/// promotion of the two input scalars; the solver picks it per call, which
/// is how plain evaluations and seeded sensitivity evaluations share one
/// implementation.
pub trait ResidualSystem {
    fn evaluate<T0, T1, S>(
        &self,
        x: &[T0],
        y: &[T1],
        rdata: &[f64],
        idata: &[i32],
    ) -> Result<Vec<S>, SteadySolError>
    where
        T0: Scalar,
        T1: Scalar,
        S: Scalar + From<T0> + From<T1>;
}

/// A converged steady state, owned by the caller once the solve returns.
#[derive(Debug, Clone)]
pub struct SteadySolution {
    pub(crate) state: DVector<f64>,
    pub(crate) iterations: usize,
    pub(crate) residual_norm: f64,
}

impl SteadySolution {
    /// Get the steady-state vector
    pub fn state(&self) -> &DVector<f64> {
        &self.state
    }

    /// Get the number of Newton iterations the solve took
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Get the residual norm at the accepted state
    pub fn residual_norm(&self) -> f64 {
        self.residual_norm
    }

    /// Consume the solution, yielding the steady-state vector
    pub fn into_state(self) -> DVector<f64> {
        self.state
    }
}
