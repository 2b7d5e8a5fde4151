//! Steady-state computation for repeated dosing.
//!
//! The entry points here bind a residual system to one dosing event,
//! assemble the data carriers the residual expects from a [`DosingRegimen`],
//! and drive the Newton solve. Sensitivities of the steady state are
//! propagated through the implicit function theorem, never by
//! differentiating the iteration.

mod feasibility;
mod residual;

pub use feasibility::check_infusion_feasibility;
pub use residual::{FixedDoseResidual, VariableDoseResidual};

use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::data::DosingRegimen;
use crate::error::SteadySolError;
use crate::integrator::Integrate;
use crate::model::OdeSystem;
use crate::solver::{NewtonSolver, SteadySolution};

/// Compute the steady state of `model` under `regimen` with fixed dose
/// amount and rate; only `params` are differentiable quantities.
///
/// # Arguments
///
/// * `model` - The ODE right-hand side
/// * `integrator` - Integrator for the cycle legs
/// * `regimen` - The repeated-dosing regimen
/// * `params` - Model parameter vector
/// * `nstates` - Number of model compartments
/// * `solver` - The Newton solver configuration
pub fn steady_state<M: OdeSystem, I: Integrate>(
    model: &M,
    integrator: &I,
    regimen: &DosingRegimen,
    params: &[f64],
    nstates: usize,
    solver: &NewtonSolver,
) -> Result<SteadySolution, SteadySolError> {
    let system = FixedDoseResidual::new(model, regimen.interval(), regimen.compartment(), integrator);
    let rdata = regimen.fixed_dose_data(nstates)?;
    let x0 = vec![0.0; nstates];
    solver.solve(&system, &x0, params, &rdata, &[])
}

/// As [`steady_state`], additionally returning `d x*/d params` (one column
/// per parameter) from the implicit function theorem at the root.
pub fn steady_state_with_sensitivity<M: OdeSystem, I: Integrate>(
    model: &M,
    integrator: &I,
    regimen: &DosingRegimen,
    params: &[f64],
    nstates: usize,
    solver: &NewtonSolver,
) -> Result<(SteadySolution, DMatrix<f64>), SteadySolError> {
    let system = FixedDoseResidual::new(model, regimen.interval(), regimen.compartment(), integrator);
    let rdata = regimen.fixed_dose_data(nstates)?;
    let x0 = vec![0.0; nstates];
    solver.solve_with_sensitivity(&system, &x0, params, &rdata, &[])
}

/// Compute the steady state when the effective dose amount is itself a
/// differentiable quantity. The amount is appended to the parameter vector
/// internally; truncated-infusion regimens are rejected.
pub fn variable_dose_steady_state<M: OdeSystem, I: Integrate>(
    model: &M,
    integrator: &I,
    regimen: &DosingRegimen,
    params: &[f64],
    nstates: usize,
    solver: &NewtonSolver,
) -> Result<SteadySolution, SteadySolError> {
    let system =
        VariableDoseResidual::new(model, regimen.interval(), regimen.compartment(), integrator);
    let rdata = regimen.rate_vector(nstates)?;
    let y = regimen.variable_dose_parameters(params);
    let x0 = vec![0.0; nstates];
    solver.solve(&system, &x0, &y, &rdata, &[])
}

/// As [`variable_dose_steady_state`], additionally returning sensitivities
/// of the steady state with respect to `params` and, in the last column,
/// the dose amount.
pub fn variable_dose_steady_state_with_sensitivity<M: OdeSystem, I: Integrate>(
    model: &M,
    integrator: &I,
    regimen: &DosingRegimen,
    params: &[f64],
    nstates: usize,
    solver: &NewtonSolver,
) -> Result<(SteadySolution, DMatrix<f64>), SteadySolError> {
    let system =
        VariableDoseResidual::new(model, regimen.interval(), regimen.compartment(), integrator);
    let rdata = regimen.rate_vector(nstates)?;
    let y = regimen.variable_dose_parameters(params);
    let x0 = vec![0.0; nstates];
    solver.solve_with_sensitivity(&system, &x0, &y, &rdata, &[])
}

/// Solve many independent dosing events in parallel.
///
/// Each event gets its own residual system and solve; a failure for one
/// event is reported in its slot and never blocks the others.
pub fn steady_state_population<M, I>(
    model: &M,
    integrator: &I,
    regimens: &[DosingRegimen],
    params: &[f64],
    nstates: usize,
    solver: &NewtonSolver,
) -> Vec<Result<SteadySolution, SteadySolError>>
where
    M: OdeSystem + Sync,
    I: Integrate + Sync,
{
    regimens
        .par_iter()
        .enumerate()
        .map(|(event, regimen)| {
            let res = steady_state(model, integrator, regimen, params, nstates, solver);
            if let Err(err) = &res {
                tracing::error!(event, error = %err, "steady-state solve failed");
            }
            res
        })
        .collect()
}
