//! Reference components for coupled systems.
//!
//! These cover the two component kinds: static components such as [`LinearCombination`]
//! and the Sellar disciplines, and time-stepping components such as [`Integrator`] and the
//! mass-spring subsystems.

pub mod components;

pub use components::*;
