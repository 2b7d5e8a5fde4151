//! Canonical compartment models.
//!
//! These cover the structural models most regimens are solved against and
//! double as reference systems for the test suite. All of them read the
//! active infusion rate for compartment `i` from `rdata[i]`.

use super::{ModelError, OdeSystem, Scalar};

/// One-compartment model with linear elimination.
///
/// Parameters: `[ke]`
///
/// ```text
/// dx[0] = rateiv[0] - ke * x[0]
/// ```
pub struct OneCompartment;

impl OdeSystem for OneCompartment {
    fn derivatives<S: Scalar>(
        &self,
        _t: f64,
        x: &[S],
        p: &[S],
        rdata: &[f64],
        _idata: &[i32],
        dx: &mut [S],
    ) -> Result<(), ModelError> {
        let ke = p[0];
        dx[0] = S::from(rdata[0]) - x[0] * ke;
        Ok(())
    }
}

/// One-compartment model with first-order absorption from a depot.
///
/// Parameters: `[ka, ke]`
///
/// ```text
/// dx[0] = rateiv[0] - ka * x[0]
/// dx[1] = rateiv[1] + ka * x[0] - ke * x[1]
/// ```
pub struct OneCompartmentWithAbsorption;

impl OdeSystem for OneCompartmentWithAbsorption {
    fn derivatives<S: Scalar>(
        &self,
        _t: f64,
        x: &[S],
        p: &[S],
        rdata: &[f64],
        _idata: &[i32],
        dx: &mut [S],
    ) -> Result<(), ModelError> {
        let ka = p[0];
        let ke = p[1];
        dx[0] = S::from(rdata[0]) - x[0] * ka;
        dx[1] = S::from(rdata[1]) + x[0] * ka - x[1] * ke;
        Ok(())
    }
}

/// Two-compartment model with central elimination.
///
/// Parameters: `[ke, k12, k21]`
///
/// ```text
/// dx[0] = rateiv[0] - (ke + k12) * x[0] + k21 * x[1]
/// dx[1] = rateiv[1] + k12 * x[0] - k21 * x[1]
/// ```
pub struct TwoCompartments;

impl OdeSystem for TwoCompartments {
    fn derivatives<S: Scalar>(
        &self,
        _t: f64,
        x: &[S],
        p: &[S],
        rdata: &[f64],
        _idata: &[i32],
        dx: &mut [S],
    ) -> Result<(), ModelError> {
        let ke = p[0];
        let k12 = p[1];
        let k21 = p[2];
        dx[0] = S::from(rdata[0]) - x[0] * (ke + k12) + x[1] * k21;
        dx[1] = S::from(rdata[1]) + x[0] * k12 - x[1] * k21;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use num_dual::Dual64;

    #[test]
    fn one_compartment_derivative_matches_closed_form() {
        let model = OneCompartment;
        let mut dx = [0.0];
        model
            .derivatives(0.0, &[10.0], &[0.1], &[2.0], &[], &mut dx)
            .unwrap();
        assert_relative_eq!(dx[0], 2.0 - 0.1 * 10.0);
    }

    #[test]
    fn one_compartment_propagates_state_sensitivity() {
        let model = OneCompartment;
        // Seed d/dx[0]: the derivative of dx[0] w.r.t. x[0] is -ke.
        let x = [Dual64::new(10.0, 1.0)];
        let p = [Dual64::from(0.1)];
        let mut dx = [Dual64::from(0.0)];
        model.derivatives(0.0, &x, &p, &[0.0], &[], &mut dx).unwrap();
        assert_relative_eq!(dx[0].re, -1.0);
        assert_relative_eq!(dx[0].eps, -0.1);
    }

    #[test]
    fn two_compartment_mass_is_conserved_without_elimination() {
        let model = TwoCompartments;
        let mut dx = [0.0, 0.0];
        model
            .derivatives(0.0, &[5.0, 3.0], &[0.0, 0.4, 0.2], &[0.0, 0.0], &[], &mut dx)
            .unwrap();
        assert_relative_eq!(dx[0] + dx[1], 0.0, epsilon = 1e-12);
    }
}
