mod dopri;

pub use dopri::Dopri45;

use thiserror::Error;

use crate::model::{ModelError, OdeSystem, Scalar};

/// Errors raised while integrating the model forward in time.
#[derive(Error, Debug, Clone)]
pub enum IntegrateError {
    /// Step control drove the step size to zero; a parameter is likely
    /// approaching 0.0 or infinity
    #[error("integration step size underflowed at t = {t}")]
    StepSizeTooSmall { t: f64 },

    /// The step budget ran out before reaching the requested time
    #[error("integration exceeded the maximum of {max} steps")]
    MaxStepsExceeded { max: usize },

    /// The state left the representable range
    #[error("non-finite state encountered at t = {t}")]
    NonFiniteState { t: f64 },

    /// Output times must not move backwards
    #[error("requested output time {t} precedes the current time")]
    NonIncreasingTime { t: f64 },

    /// A failure raised by the model right-hand side
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// The integrator collaborator: solves the model forward from `x0` at `t0`
/// and reports the state at each requested output time.
///
/// Implementations must preserve the scalar type of their inputs so
/// sensitivity information carried by dual numbers in the state or the
/// parameters flows through the integration unmodified. The returned vector
/// holds exactly one state per entry of `times`, in order.
pub trait Integrate {
    fn integrate<M: OdeSystem, S: Scalar>(
        &self,
        model: &M,
        x0: Vec<S>,
        t0: f64,
        times: &[f64],
        p: &[S],
        rdata: &[f64],
        idata: &[i32],
    ) -> Result<Vec<Vec<S>>, IntegrateError>;
}
