//! Residual systems whose root is the steady state of one dosing cycle.
//!
//! Both systems close over the model, the inter-dose interval, the dosing
//! compartment and an integrator, and branch on the dosing regime at every
//! evaluation. They hold no solver state: the root solver re-evaluates them
//! freely at arbitrary candidate states.

use super::check_infusion_feasibility;
use crate::data::Regime;
use crate::error::SteadySolError;
use crate::integrator::{Integrate, IntegrateError};
use crate::model::{OdeSystem, Scalar};
use crate::solver::ResidualSystem;

const FIXED_DOSE_CONTEXT: &str = "fixed-dose steady-state event";
const VARIABLE_DOSE_CONTEXT: &str = "variable-dose steady-state event";

/// Run one integration leg from time zero and return the end state.
fn integrate_leg<M: OdeSystem, I: Integrate, S: Scalar>(
    integrator: &I,
    model: &M,
    x0: Vec<S>,
    t: f64,
    p: &[S],
    rdata: &[f64],
    idata: &[i32],
) -> Result<Vec<S>, IntegrateError> {
    let mut states = integrator.integrate(model, x0, 0.0, &[t], p, rdata, idata)?;
    Ok(states.swap_remove(0))
}

/// Pre-dose state minus the prediction one cycle later.
fn cycle_residual<T0, S>(x: &[T0], pred: &[S]) -> Vec<S>
where
    T0: Scalar,
    S: Scalar + From<T0>,
{
    x.iter()
        .zip(pred)
        .map(|(&xi, &pi)| S::from(xi) - pi)
        .collect()
}

/// Residual system for regimens whose dose amount and infusion rate are both
/// fixed quantities; only the model parameters are differentiable.
///
/// The real-data vector holds the per-compartment infusion rates followed by
/// the dose amount as its last element. The amount is stripped before real
/// data is handed to the integrator.
pub struct FixedDoseResidual<'a, M, I> {
    model: &'a M,
    interval: f64,
    compartment: i32,
    integrator: &'a I,
}

impl<'a, M: OdeSystem, I: Integrate> FixedDoseResidual<'a, M, I> {
    /// Bind a residual system to one dosing event.
    ///
    /// # Arguments
    ///
    /// * `model` - The ODE right-hand side
    /// * `interval` - Inter-dose interval, zero for continuous infusion
    /// * `compartment` - Dosing compartment (1-based, ≤ 0 for none)
    /// * `integrator` - The integrator used for each cycle leg
    pub fn new(model: &'a M, interval: f64, compartment: i32, integrator: &'a I) -> Self {
        FixedDoseResidual {
            model,
            interval,
            compartment,
            integrator,
        }
    }

    fn dose_rate(&self, rates: &[f64]) -> Result<f64, SteadySolError> {
        if self.compartment < 1 {
            return Ok(0.0);
        }
        let idx = self.compartment as usize - 1;
        if idx >= rates.len() {
            return Err(SteadySolError::CompartmentOutOfRange {
                compartment: self.compartment,
                nstates: rates.len(),
            });
        }
        Ok(rates[idx])
    }
}

impl<M: OdeSystem, I: Integrate> ResidualSystem for FixedDoseResidual<'_, M, I> {
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
        S: Scalar + From<T0> + From<T1>,
    {
        let amount = *rdata.last().ok_or(SteadySolError::MissingDoseAmount {
            carrier: "real data",
        })?;
        // Real data handed to the integrator must not carry the amount.
        let rdata_ode = &rdata[..rdata.len() - 1];
        let rate = self.dose_rate(rdata_ode)?;

        let mut x0: Vec<S> = x.iter().map(|&v| S::from(v)).collect();
        let params: Vec<S> = y.iter().map(|&v| S::from(v)).collect();

        match Regime::classify(rate, self.interval) {
            Regime::Bolus => {
                if self.compartment >= 1 {
                    let idx = self.compartment as usize - 1;
                    if idx >= x0.len() {
                        return Err(SteadySolError::CompartmentOutOfRange {
                            compartment: self.compartment,
                            nstates: x0.len(),
                        });
                    }
                    x0[idx] += S::from(amount);
                }
                let pred = integrate_leg(
                    self.integrator,
                    self.model,
                    x0,
                    self.interval,
                    &params,
                    rdata_ode,
                    idata,
                )?;
                Ok(cycle_residual(x, &pred))
            }
            Regime::TruncatedInfusion => {
                let delta = amount / rate;
                check_infusion_feasibility(amount, delta, self.interval, FIXED_DOSE_CONTEXT)?;

                let end_of_infusion = integrate_leg(
                    self.integrator,
                    self.model,
                    x0,
                    delta,
                    &params,
                    rdata_ode,
                    idata,
                )?;
                // Rates live in the prefix of the real data; the washout leg
                // runs with no active infusion.
                let mut washout = rdata_ode.to_vec();
                for r in washout.iter_mut().take(x.len()) {
                    *r = 0.0;
                }
                let pred = integrate_leg(
                    self.integrator,
                    self.model,
                    end_of_infusion,
                    self.interval - delta,
                    &params,
                    &washout,
                    idata,
                )?;
                Ok(cycle_residual(x, &pred))
            }
            Regime::ConstantInfusion => {
                let mut dx = vec![S::from(0.0); x.len()];
                self.model
                    .derivatives(0.0, &x0, &params, rdata_ode, idata, &mut dx)?;
                Ok(dx)
            }
        }
    }
}

/// Residual system for regimens whose effective dose amount is itself a
/// differentiable quantity, typically because bioavailability is an
/// estimated parameter.
///
/// The amount is carried as the last element of the parameter vector; the
/// remaining prefix is the model parameter vector. The infusion rate stays
/// fixed in real data, which is passed to the integrator unmodified.
pub struct VariableDoseResidual<'a, M, I> {
    model: &'a M,
    interval: f64,
    compartment: i32,
    integrator: &'a I,
}

impl<'a, M: OdeSystem, I: Integrate> VariableDoseResidual<'a, M, I> {
    /// Bind a residual system to one dosing event. Arguments as for
    /// [`FixedDoseResidual::new`].
    pub fn new(model: &'a M, interval: f64, compartment: i32, integrator: &'a I) -> Self {
        VariableDoseResidual {
            model,
            interval,
            compartment,
            integrator,
        }
    }

    fn dose_rate(&self, rates: &[f64]) -> Result<f64, SteadySolError> {
        if self.compartment < 1 {
            return Ok(0.0);
        }
        let idx = self.compartment as usize - 1;
        if idx >= rates.len() {
            return Err(SteadySolError::CompartmentOutOfRange {
                compartment: self.compartment,
                nstates: rates.len(),
            });
        }
        Ok(rates[idx])
    }
}

impl<M: OdeSystem, I: Integrate> ResidualSystem for VariableDoseResidual<'_, M, I> {
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
        S: Scalar + From<T0> + From<T1>,
    {
        let amount = S::from(*y.last().ok_or(SteadySolError::MissingDoseAmount {
            carrier: "the parameter vector",
        })?);
        let params: Vec<S> = y[..y.len() - 1].iter().map(|&v| S::from(v)).collect();
        let rate = self.dose_rate(rdata)?;

        let mut x0: Vec<S> = x.iter().map(|&v| S::from(v)).collect();

        match Regime::classify(rate, self.interval) {
            Regime::Bolus => {
                if self.compartment >= 1 {
                    let idx = self.compartment as usize - 1;
                    if idx >= x0.len() {
                        return Err(SteadySolError::CompartmentOutOfRange {
                            compartment: self.compartment,
                            nstates: x0.len(),
                        });
                    }
                    x0[idx] += amount;
                }
                let pred = integrate_leg(
                    self.integrator,
                    self.model,
                    x0,
                    self.interval,
                    &params,
                    rdata,
                    idata,
                )?;
                Ok(cycle_residual(x, &pred))
            }
            Regime::TruncatedInfusion => Err(SteadySolError::UnsupportedConfiguration {
                context: VARIABLE_DOSE_CONTEXT,
                reason: "truncated infusions (rate > 0 and interval > 0) are not supported \
                         when the effective dose amount is a differentiable parameter"
                    .to_string(),
            }),
            Regime::ConstantInfusion => {
                let mut dx = vec![S::from(0.0); x.len()];
                self.model
                    .derivatives(0.0, &x0, &params, rdata, idata, &mut dx)?;
                Ok(dx)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrator::Dopri45;
    use crate::model::library::OneCompartment;
    use approx::assert_relative_eq;

    #[test]
    fn bolus_residual_vanishes_at_analytic_steady_state() {
        let integrator = Dopri45::new(1e-10, 1e-12);
        let system = FixedDoseResidual::new(&OneCompartment, 24.0, 1, &integrator);
        let decay = (-0.1f64 * 24.0).exp();
        let xss = 100.0 * decay / (1.0 - decay);
        let residual: Vec<f64> = system
            .evaluate(&[xss], &[0.1], &[0.0, 100.0], &[])
            .unwrap();
        assert_relative_eq!(residual[0], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn constant_infusion_residual_is_the_raw_right_hand_side() {
        let integrator = Dopri45::default();
        let system = FixedDoseResidual::new(&OneCompartment, 0.0, 1, &integrator);
        // dx = rate - ke * x, so the residual at x is 3 - 0.1 x.
        let residual: Vec<f64> = system.evaluate(&[5.0], &[0.1], &[3.0, 0.0], &[]).unwrap();
        assert_relative_eq!(residual[0], 3.0 - 0.1 * 5.0, epsilon = 1e-12);
    }

    #[test]
    fn variable_dose_truncated_infusion_is_rejected_up_front() {
        let integrator = Dopri45::default();
        let system = VariableDoseResidual::new(&OneCompartment, 24.0, 1, &integrator);
        let res: Result<Vec<f64>, _> = system.evaluate(&[1.0], &[0.1, 100.0], &[5.0], &[]);
        assert!(matches!(
            res,
            Err(SteadySolError::UnsupportedConfiguration { .. })
        ));
    }

    #[test]
    fn empty_data_carriers_are_reported() {
        let integrator = Dopri45::default();
        let dd = FixedDoseResidual::new(&OneCompartment, 24.0, 1, &integrator);
        let res: Result<Vec<f64>, _> = dd.evaluate(&[1.0], &[0.1], &[], &[]);
        assert!(matches!(
            res,
            Err(SteadySolError::MissingDoseAmount { carrier: "real data" })
        ));

        let vd = VariableDoseResidual::new(&OneCompartment, 24.0, 1, &integrator);
        let empty: [f64; 0] = [];
        let res: Result<Vec<f64>, _> = vd.evaluate(&[1.0], &empty, &[0.0], &[]);
        assert!(matches!(
            res,
            Err(SteadySolError::MissingDoseAmount { .. })
        ));
    }

    #[test]
    fn degenerate_candidate_states_still_evaluate() {
        let integrator = Dopri45::default();
        let system = FixedDoseResidual::new(&OneCompartment, 24.0, 1, &integrator);
        for x in [-50.0, 0.0] {
            let residual: Vec<f64> = system
                .evaluate(&[x], &[0.1], &[0.0, 100.0], &[])
                .unwrap();
            assert!(residual[0].is_finite());
        }
    }
}
