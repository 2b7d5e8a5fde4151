use thiserror::Error;

use crate::integrator::IntegrateError;
use crate::model::ModelError;
use crate::solver::SolverError;

/// Errors surfaced while setting up or running a steady-state solve.
///
/// Residual evaluation performs no local recovery: integrator and model
/// failures bubble up unchanged, and a failed solve for one dosing event
/// never affects other, independent events.
#[derive(Error, Debug)]
pub enum SteadySolError {
    /// The truncated-infusion configuration cannot be resolved by a
    /// single-infusion-per-cycle model
    #[error("infeasible infusion in {context}: {reason}")]
    InfeasibleInfusion {
        context: &'static str,
        reason: String,
    },

    /// A declared capability gap, rejected up front rather than solved wrong
    #[error("unsupported configuration in {context}: {reason}")]
    UnsupportedConfiguration {
        context: &'static str,
        reason: String,
    },

    /// The dosing regimen violates its own invariants
    #[error("invalid dosing regimen: {reason}")]
    InvalidRegimen { reason: String },

    /// The 1-based dosing compartment does not exist in the model
    #[error("dosing compartment {compartment} is out of range for a model with {nstates} states")]
    CompartmentOutOfRange { compartment: i32, nstates: usize },

    /// The data carrier reserved for the dose amount is empty
    #[error("{carrier} must carry the dose amount as its last element")]
    MissingDoseAmount { carrier: &'static str },

    /// A failure inside the ODE integrator
    #[error(transparent)]
    Integrate(#[from] IntegrateError),

    /// A failure raised by the model right-hand side
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A failure in the nonlinear root solve
    #[error(transparent)]
    Solver(#[from] SolverError),
}
