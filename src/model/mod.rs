pub mod library;

use num_dual::DualNum;
use thiserror::Error;

/// Scalar types a model can be evaluated with: plain `f64`, or any
/// forward-mode dual number (of any nesting depth) so that derivatives of
/// the state with respect to parameters or doses propagate exactly through
/// every arithmetic operation.
///
/// The capability set is `num_dual::DualNum<f64>` plus `Copy`: arithmetic
/// with itself and with `f64`, the transcendental functions, lifting via
/// `From<f64>` and projection onto the value part via `re()`.
pub trait Scalar: DualNum<f64> + Copy {}
impl<T> Scalar for T where T: DualNum<f64> + Copy {}

/// Errors raised by a model right-hand side.
#[derive(Error, Debug, Clone)]
pub enum ModelError {
    /// The derivative vector contains NaN or infinity
    #[error("non-finite derivative at t = {time}")]
    NonFiniteDerivative { time: f64 },

    /// Any other model-specific failure
    #[error("model evaluation failed: {0}")]
    Other(String),
}

/// An ODE right-hand side `dx/dt = f(t, x, p)` over a compartment model.
///
/// Implementations must be stateless aside from captured configuration and
/// callable any number of times; the same instance is shared by every
/// residual evaluation of a solve and may be used from several threads.
///
/// Params:
/// - `t`: The time at which the derivative is evaluated
/// - `x`: The state vector at time t
/// - `p`: The parameters of the model
/// - `rdata`: Fixed real covariates; by convention the first `x.len()`
///   entries are the active infusion rate into each compartment
/// - `idata`: Fixed integer covariates
/// - `dx`: A mutable reference to the derivative of the state vector,
///   zero-initialized by the caller
///
/// The method is generic over the scalar so the same right-hand side
/// produces plain values and exact sensitivities.
pub trait OdeSystem {
    fn derivatives<S: Scalar>(
        &self,
        t: f64,
        x: &[S],
        p: &[S],
        rdata: &[f64],
        idata: &[i32],
        dx: &mut [S],
    ) -> Result<(), ModelError>;
}
