use crate::error::SteadySolError;

/// Validate that a truncated-infusion configuration is solvable by a
/// single-infusion-per-cycle model.
///
/// `duration` is the per-cycle infusion duration (`amount / rate`). A
/// duration longer than the inter-dose interval would require infusions
/// from previous cycles to still be running when the next dose starts,
/// which the steady-state algorithm does not model.
pub fn check_infusion_feasibility(
    amount: f64,
    duration: f64,
    interval: f64,
    context: &'static str,
) -> Result<(), SteadySolError> {
    if !duration.is_finite() {
        return Err(SteadySolError::InfeasibleInfusion {
            context,
            reason: format!("infusion duration {duration} (amount {amount}) is not finite"),
        });
    }
    if duration < 0.0 {
        return Err(SteadySolError::InfeasibleInfusion {
            context,
            reason: format!("infusion duration {duration} (amount {amount}) is negative"),
        });
    }
    if duration > interval {
        return Err(SteadySolError::InfeasibleInfusion {
            context,
            reason: format!(
                "infusion duration {duration} exceeds the inter-dose interval {interval}; \
                 overlapping infusions from consecutive doses are not supported"
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_infusion_shorter_than_interval() {
        assert!(check_infusion_feasibility(100.0, 10.0, 24.0, "test").is_ok());
    }

    #[test]
    fn accepts_infusion_filling_the_whole_interval() {
        assert!(check_infusion_feasibility(100.0, 24.0, 24.0, "test").is_ok());
    }

    #[test]
    fn accepts_zero_duration() {
        assert!(check_infusion_feasibility(0.0, 0.0, 24.0, "test").is_ok());
    }

    #[test]
    fn rejects_duration_longer_than_interval() {
        let err = check_infusion_feasibility(100.0, 100.0, 50.0, "test").unwrap_err();
        assert!(matches!(
            err,
            SteadySolError::InfeasibleInfusion { context: "test", .. }
        ));
    }

    #[test]
    fn rejects_non_finite_duration() {
        assert!(check_infusion_feasibility(100.0, f64::NAN, 24.0, "test").is_err());
        assert!(check_infusion_feasibility(100.0, f64::INFINITY, 24.0, "test").is_err());
    }

    #[test]
    fn rejects_negative_duration() {
        assert!(check_infusion_feasibility(-100.0, -10.0, 24.0, "test").is_err());
    }
}
