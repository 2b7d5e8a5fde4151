//! Forward-mode Jacobians and implicit sensitivity propagation.
//!
//! Derivatives of the steady state never differentiate the Newton iteration
//! itself: only the residual's partials at the root are needed. Both
//! Jacobians are assembled column by column from dual-number seeds, so one
//! residual evaluation per direction yields an exact column.

use nalgebra::DMatrix;
use num_dual::Dual64;

use super::ResidualSystem;
use crate::error::SteadySolError;

/// Jacobian of the residual with respect to the candidate state.
pub(crate) fn state_jacobian<R: ResidualSystem>(
    system: &R,
    x: &[f64],
    y: &[f64],
    rdata: &[f64],
    idata: &[i32],
) -> Result<DMatrix<f64>, SteadySolError> {
    let n = x.len();
    let mut jac = DMatrix::zeros(n, n);
    for j in 0..n {
        let x_dual: Vec<Dual64> = x
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                if i == j {
                    Dual64::new(v, 1.0)
                } else {
                    Dual64::from(v)
                }
            })
            .collect();
        let residual: Vec<Dual64> = system.evaluate(&x_dual, y, rdata, idata)?;
        for i in 0..n {
            jac[(i, j)] = residual[i].eps;
        }
    }
    Ok(jac)
}

/// Jacobian of the residual with respect to the parameter vector.
pub(crate) fn parameter_jacobian<R: ResidualSystem>(
    system: &R,
    x: &[f64],
    y: &[f64],
    rdata: &[f64],
    idata: &[i32],
) -> Result<DMatrix<f64>, SteadySolError> {
    let n = x.len();
    let m = y.len();
    let mut jac = DMatrix::zeros(n, m);
    for j in 0..m {
        let y_dual: Vec<Dual64> = y
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                if i == j {
                    Dual64::new(v, 1.0)
                } else {
                    Dual64::from(v)
                }
            })
            .collect();
        let residual: Vec<Dual64> = system.evaluate(x, &y_dual, rdata, idata)?;
        for i in 0..n {
            jac[(i, j)] = residual[i].eps;
        }
    }
    Ok(jac)
}
