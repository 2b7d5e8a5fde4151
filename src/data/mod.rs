use serde::{Deserialize, Serialize};

use crate::error::SteadySolError;

/// The dosing regime in effect during one inter-dose cycle.
///
/// The regime is a pure function of `(rate, interval)`: the dose amount
/// plays no role in the classification, only in how much drug the selected
/// regime delivers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    /// Instantaneous dose added to the dosing compartment
    Bolus,
    /// Infusion at a constant rate that stops before the next dose
    TruncatedInfusion,
    /// Infusion at a constant rate that never stops (zero interval)
    ConstantInfusion,
}

impl Regime {
    /// Classify the regime from the infusion rate and the inter-dose interval.
    pub fn classify(rate: f64, interval: f64) -> Self {
        if rate == 0.0 {
            Regime::Bolus
        } else if interval > 0.0 {
            Regime::TruncatedInfusion
        } else {
            Regime::ConstantInfusion
        }
    }
}

/// A repeated-dosing regimen for one subject and one dosing compartment.
///
/// `compartment` is 1-based; zero or negative means no dosing compartment
/// (nothing is added to the state, only the cycle length matters).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DosingRegimen {
    compartment: i32,
    interval: f64,
    rate: f64,
    amount: f64,
}

impl DosingRegimen {
    /// Create a new regimen.
    ///
    /// # Arguments
    ///
    /// * `compartment` - The compartment number (1-based) receiving the dose, ≤ 0 for none
    /// * `interval` - Inter-dose interval, zero for continuous infusion
    /// * `rate` - Infusion rate, zero for a bolus
    /// * `amount` - Dose amount delivered each cycle
    pub fn new(
        compartment: i32,
        interval: f64,
        rate: f64,
        amount: f64,
    ) -> Result<Self, SteadySolError> {
        if !interval.is_finite() || interval < 0.0 {
            return Err(SteadySolError::InvalidRegimen {
                reason: format!("inter-dose interval must be finite and non-negative, got {interval}"),
            });
        }
        if !rate.is_finite() || rate < 0.0 {
            return Err(SteadySolError::InvalidRegimen {
                reason: format!("infusion rate must be finite and non-negative, got {rate}"),
            });
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(SteadySolError::InvalidRegimen {
                reason: format!("dose amount must be finite and non-negative, got {amount}"),
            });
        }
        Ok(DosingRegimen {
            compartment,
            interval,
            rate,
            amount,
        })
    }

    /// A repeated bolus regimen.
    pub fn bolus(compartment: i32, amount: f64, interval: f64) -> Result<Self, SteadySolError> {
        Self::new(compartment, interval, 0.0, amount)
    }

    /// A repeated truncated-infusion regimen.
    pub fn infusion(
        compartment: i32,
        amount: f64,
        rate: f64,
        interval: f64,
    ) -> Result<Self, SteadySolError> {
        Self::new(compartment, interval, rate, amount)
    }

    /// A continuous infusion (zero inter-dose interval).
    pub fn constant_infusion(compartment: i32, rate: f64) -> Result<Self, SteadySolError> {
        Self::new(compartment, 0.0, rate, 0.0)
    }

    /// Get the dosing compartment (1-based, ≤ 0 for none)
    pub fn compartment(&self) -> i32 {
        self.compartment
    }

    /// Get the inter-dose interval
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Get the infusion rate
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Get the dose amount delivered each cycle
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// The regime this regimen selects.
    pub fn regime(&self) -> Regime {
        Regime::classify(self.rate, self.interval)
    }

    /// Duration of one infusion, `None` for a bolus.
    pub fn infusion_duration(&self) -> Option<f64> {
        (self.rate > 0.0).then(|| self.amount / self.rate)
    }

    /// Per-compartment infusion rates: zeros except the dosing compartment.
    pub fn rate_vector(&self, nstates: usize) -> Result<Vec<f64>, SteadySolError> {
        if self.compartment >= 1 && self.compartment as usize > nstates {
            return Err(SteadySolError::CompartmentOutOfRange {
                compartment: self.compartment,
                nstates,
            });
        }
        let mut rates = vec![0.0; nstates];
        if self.compartment >= 1 {
            rates[self.compartment as usize - 1] = self.rate;
        }
        Ok(rates)
    }

    /// Real-data vector for the fixed-dose residual system: the
    /// per-compartment rates with the dose amount appended last.
    pub fn fixed_dose_data(&self, nstates: usize) -> Result<Vec<f64>, SteadySolError> {
        let mut dat = self.rate_vector(nstates)?;
        dat.push(self.amount);
        Ok(dat)
    }

    /// Parameter vector for the variable-dose residual system: the model
    /// parameters with the (differentiable) dose amount appended last.
    pub fn variable_dose_parameters(&self, params: &[f64]) -> Vec<f64> {
        let mut y = params.to_vec();
        y.push(self.amount);
        y
    }
}
