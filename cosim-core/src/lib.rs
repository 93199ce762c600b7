pub mod adapter;
pub mod component;
pub mod duration;
pub mod graph;
pub mod inputs;
pub mod ivp;
pub mod partition;
pub mod solver;
pub mod state;
pub mod system;
pub mod time_grid;
pub mod timeseries;

pub mod errors;

#[cfg(test)]
mod example_components;
