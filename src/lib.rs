//! Co-simulation of coupled static and time-stepping components.
//!
//! Components exchange values through variables with matching names.
//! A [`SystemBuilder`](cosim_core::system::SystemBuilder) discovers the couplings,
//! orders the components and resolves groups of mutually dependent components at every
//! step of a time grid.
//!
//! ```no_run
//! use cosim::components::MassSpringParameters;
//! use cosim::core::system::SystemBuilder;
//! use std::sync::Arc;
//!
//! let (first, second) = MassSpringParameters::default().subsystems();
//! let mut system = SystemBuilder::new()
//!     .with_component(Arc::new(first))
//!     .with_component(Arc::new(second))
//!     .with_final_time(10.0)
//!     .with_time_step(0.01)
//!     .build()
//!     .unwrap();
//! system.execute().unwrap();
//! ```

pub use cosim_components as components;
pub use cosim_core as core;
