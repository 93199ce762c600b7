mod integrator;
mod linear_combination;
pub mod mass_spring;
pub mod sellar;

pub use integrator::{Integrator, IntegratorParameters, IntegratorState};
pub use linear_combination::{LinearCombination, LinearCombinationParameters};
pub use mass_spring::{
    MassParameters, MassSpringParameters, MassSpringSubsystem, MassSpringSystem,
};
pub use sellar::{Sellar1, Sellar2, SellarSystem};
