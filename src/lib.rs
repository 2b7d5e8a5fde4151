pub mod data;
pub mod error;
pub mod integrator;
pub mod model;
pub mod solver;
pub mod steadystate;

pub use crate::data::{DosingRegimen, Regime};
pub use crate::integrator::{Dopri45, Integrate};
pub use crate::model::{OdeSystem, Scalar};
pub use crate::solver::{NewtonSolver, ResidualSystem, SteadySolution};
pub use crate::steadystate::{
    check_infusion_feasibility, steady_state, steady_state_population,
    steady_state_with_sensitivity, variable_dose_steady_state,
    variable_dose_steady_state_with_sensitivity, FixedDoseResidual, VariableDoseResidual,
};
pub use error::SteadySolError;

pub mod prelude {
    pub mod data {
        pub use crate::data::{DosingRegimen, Regime};
    }
    pub mod models {
        pub use crate::model::library::{
            OneCompartment, OneCompartmentWithAbsorption, TwoCompartments,
        };
    }

    pub use crate::data::{DosingRegimen, Regime};
    pub use crate::error::SteadySolError;
    pub use crate::integrator::{Dopri45, Integrate};
    pub use crate::model::{OdeSystem, Scalar};
    pub use crate::solver::{NewtonSolver, ResidualSystem, SteadySolution};
    pub use crate::steadystate::{
        check_infusion_feasibility, steady_state, steady_state_population,
        steady_state_with_sensitivity, variable_dose_steady_state,
        variable_dose_steady_state_with_sensitivity, FixedDoseResidual, VariableDoseResidual,
    };
}
