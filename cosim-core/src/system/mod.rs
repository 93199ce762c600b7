//! A system consists of a set of coupled components which are advanced together in time.
//!
//! The system orchestrates the passing of values between components.
//! Components are coupled by name: an output feeds every input with the same name.
//! At each time step the components are executed in an order determined by their
//! couplings, with groups of mutually dependent components resolved iteratively.
//! Once every group is resolved the system moves to the next time point.
//!
//! Inputs which are not produced by any component must be fed by an external source
//! or have a default value.
//! This is checked when building the system.

mod builder;
mod options;
mod runtime;
mod state_extraction;
mod types;

#[cfg(test)]
mod tests;

pub use builder::SystemBuilder;
pub use options::SystemOptions;
pub use runtime::TimeSteppingSystem;
pub use state_extraction::extract_state;
pub use types::{ExecutionState, RunStatus, SimulationResults, SystemSnapshot};
