//! Adaptive Dormand-Prince 5(4) stepper, generic over the scalar so dual
//! numbers propagate through every stage.

use super::{Integrate, IntegrateError};
use crate::model::{OdeSystem, Scalar};

const RTOL: f64 = 1e-8;
const ATOL: f64 = 1e-10;
const H0: f64 = 1e-3;
const MAX_STEPS: usize = 100_000;
const MIN_STEP: f64 = 1e-14;
const SAFETY: f64 = 0.9;

// Dormand-Prince tableau
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// Fifth-order weights (also the last stage row: first-same-as-last)
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// Difference between the fifth- and fourth-order weights
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

/// Adaptive Dormand-Prince 5(4) integrator.
#[derive(Debug, Clone)]
pub struct Dopri45 {
    rtol: f64,
    atol: f64,
    h0: f64,
    max_steps: usize,
}

impl Default for Dopri45 {
    fn default() -> Self {
        Dopri45 {
            rtol: RTOL,
            atol: ATOL,
            h0: H0,
            max_steps: MAX_STEPS,
        }
    }
}

impl Dopri45 {
    /// Create an integrator with the given relative and absolute tolerances.
    pub fn new(rtol: f64, atol: f64) -> Self {
        Dopri45 {
            rtol,
            atol,
            ..Default::default()
        }
    }

    /// Override the initial step size.
    pub fn with_initial_step(mut self, h0: f64) -> Self {
        self.h0 = h0;
        self
    }

    /// Advance `y` from `t0` to `tf` in place.
    fn advance<M: OdeSystem, S: Scalar>(
        &self,
        model: &M,
        y: &mut Vec<S>,
        t0: f64,
        tf: f64,
        p: &[S],
        rdata: &[f64],
        idata: &[i32],
    ) -> Result<(), IntegrateError> {
        let span = tf - t0;
        if span == 0.0 {
            return Ok(());
        }
        let n = y.len();
        let mut t = t0;
        let mut h = self.h0.min(span);

        let mut k1 = vec![S::from(0.0); n];
        model.derivatives(t, y, p, rdata, idata, &mut k1)?;

        for _ in 0..self.max_steps {
            let remaining = tf - t;
            if remaining <= MIN_STEP * (1.0 + tf.abs()) {
                return Ok(());
            }
            h = h.min(remaining);
            if h < MIN_STEP * (1.0 + t.abs()) {
                return Err(IntegrateError::StepSizeTooSmall { t });
            }

            let y2: Vec<S> = (0..n).map(|i| y[i] + k1[i] * (A21 * h)).collect();
            let mut k2 = vec![S::from(0.0); n];
            model.derivatives(t + C2 * h, &y2, p, rdata, idata, &mut k2)?;

            let y3: Vec<S> = (0..n)
                .map(|i| y[i] + (k1[i] * A31 + k2[i] * A32) * h)
                .collect();
            let mut k3 = vec![S::from(0.0); n];
            model.derivatives(t + C3 * h, &y3, p, rdata, idata, &mut k3)?;

            let y4: Vec<S> = (0..n)
                .map(|i| y[i] + (k1[i] * A41 + k2[i] * A42 + k3[i] * A43) * h)
                .collect();
            let mut k4 = vec![S::from(0.0); n];
            model.derivatives(t + C4 * h, &y4, p, rdata, idata, &mut k4)?;

            let y5: Vec<S> = (0..n)
                .map(|i| y[i] + (k1[i] * A51 + k2[i] * A52 + k3[i] * A53 + k4[i] * A54) * h)
                .collect();
            let mut k5 = vec![S::from(0.0); n];
            model.derivatives(t + C5 * h, &y5, p, rdata, idata, &mut k5)?;

            let y6: Vec<S> = (0..n)
                .map(|i| {
                    y[i] + (k1[i] * A61 + k2[i] * A62 + k3[i] * A63 + k4[i] * A64 + k5[i] * A65) * h
                })
                .collect();
            let mut k6 = vec![S::from(0.0); n];
            model.derivatives(t + h, &y6, p, rdata, idata, &mut k6)?;

            let ynew: Vec<S> = (0..n)
                .map(|i| {
                    y[i] + (k1[i] * B1 + k3[i] * B3 + k4[i] * B4 + k5[i] * B5 + k6[i] * B6) * h
                })
                .collect();
            let mut k7 = vec![S::from(0.0); n];
            model.derivatives(t + h, &ynew, p, rdata, idata, &mut k7)?;

            let mut err_acc = 0.0;
            for i in 0..n {
                let e = (k1[i].re() * E1
                    + k3[i].re() * E3
                    + k4[i].re() * E4
                    + k5[i].re() * E5
                    + k6[i].re() * E6
                    + k7[i].re() * E7)
                    * h;
                let scale = self.atol + self.rtol * y[i].re().abs().max(ynew[i].re().abs());
                err_acc += (e / scale) * (e / scale);
            }
            let err = (err_acc / n as f64).sqrt();

            if err <= 1.0 {
                t += h;
                if ynew.iter().any(|v| !v.re().is_finite()) {
                    return Err(IntegrateError::NonFiniteState { t });
                }
                *y = ynew;
                k1 = k7;
            }

            let factor = if err == 0.0 {
                5.0
            } else {
                (SAFETY * err.powf(-0.2)).clamp(0.2, 5.0)
            };
            h *= factor;
        }
        Err(IntegrateError::MaxStepsExceeded {
            max: self.max_steps,
        })
    }
}

impl Integrate for Dopri45 {
    fn integrate<M: OdeSystem, S: Scalar>(
        &self,
        model: &M,
        x0: Vec<S>,
        t0: f64,
        times: &[f64],
        p: &[S],
        rdata: &[f64],
        idata: &[i32],
    ) -> Result<Vec<Vec<S>>, IntegrateError> {
        let mut state = x0;
        let mut t = t0;
        let mut out = Vec::with_capacity(times.len());
        for &t_end in times {
            if t_end < t {
                return Err(IntegrateError::NonIncreasingTime { t: t_end });
            }
            self.advance(model, &mut state, t, t_end, p, rdata, idata)?;
            out.push(state.clone());
            t = t_end;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::library::OneCompartment;
    use approx::assert_relative_eq;
    use num_dual::Dual64;

    #[test]
    fn exponential_decay_matches_closed_form() {
        let integrator = Dopri45::default();
        let sol = integrator
            .integrate(&OneCompartment, vec![100.0], 0.0, &[24.0], &[0.1], &[0.0], &[])
            .unwrap();
        assert_relative_eq!(sol[0][0], 100.0 * (-0.1f64 * 24.0).exp(), epsilon = 1e-5);
    }

    #[test]
    fn reports_one_state_per_output_time() {
        let integrator = Dopri45::default();
        let sol = integrator
            .integrate(
                &OneCompartment,
                vec![100.0],
                0.0,
                &[6.0, 12.0, 24.0],
                &[0.1],
                &[0.0],
                &[],
            )
            .unwrap();
        assert_eq!(sol.len(), 3);
        assert_relative_eq!(sol[1][0], 100.0 * (-0.1f64 * 12.0).exp(), epsilon = 1e-5);
    }

    #[test]
    fn zero_length_interval_leaves_state_unchanged() {
        let integrator = Dopri45::default();
        let sol = integrator
            .integrate(&OneCompartment, vec![42.0], 0.0, &[0.0], &[0.1], &[0.0], &[])
            .unwrap();
        assert_eq!(sol[0][0], 42.0);
    }

    #[test]
    fn rejects_backwards_output_times() {
        let integrator = Dopri45::default();
        let res = integrator.integrate(
            &OneCompartment,
            vec![1.0],
            0.0,
            &[12.0, 6.0],
            &[0.1],
            &[0.0],
            &[],
        );
        assert!(matches!(res, Err(IntegrateError::NonIncreasingTime { .. })));
    }

    #[test]
    fn dual_state_carries_exact_parameter_sensitivity() {
        // d/dke of 100 * exp(-ke * t) at ke = 0.1, t = 24 is -t * x(t).
        let integrator = Dopri45::default();
        let x0 = vec![Dual64::from(100.0)];
        let p = vec![Dual64::new(0.1, 1.0)];
        let sol = integrator
            .integrate(&OneCompartment, x0, 0.0, &[24.0], &p, &[0.0], &[])
            .unwrap();
        let expected = 100.0 * (-0.1f64 * 24.0).exp();
        assert_relative_eq!(sol[0][0].re, expected, epsilon = 1e-5);
        assert_relative_eq!(sol[0][0].eps, -24.0 * expected, max_relative = 1e-4);
    }

    #[test]
    fn constant_infusion_accumulates_toward_plateau() {
        // dx = r - ke x from 0: x(t) = (r / ke) (1 - exp(-ke t))
        let integrator = Dopri45::default();
        let sol = integrator
            .integrate(&OneCompartment, vec![0.0], 0.0, &[10.0], &[0.2], &[3.0], &[])
            .unwrap();
        let expected = 3.0 / 0.2 * (1.0 - (-0.2f64 * 10.0).exp());
        assert_relative_eq!(sol[0][0], expected, epsilon = 1e-5);
    }
}
