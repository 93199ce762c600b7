//! Configuration of a time-stepping system.

use crate::duration::DurationValue;
use crate::errors::{CosimError, CosimResult};
use crate::solver::{CycleSolver, CycleSolverKind, CycleSolverOptions};
use crate::time_grid::TimeGrid;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_true() -> bool {
    true
}

/// Options of a [`TimeSteppingSystem`](super::TimeSteppingSystem)
///
/// Times may be given in seconds or as duration strings such as `"1h 30m"`.
///
/// ```toml
/// final_time = "10s"
/// time_step = 0.5
/// restart = false
/// algo_name = "GaussSeidel"
///
/// [mda_options]
/// max_iterations = 20
/// tolerance = 1e-8
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemOptions {
    #[serde(default)]
    pub initial_time: DurationValue,
    pub final_time: DurationValue,
    pub time_step: DurationValue,
    /// Reset the components and the time at the start of every execution
    #[serde(default = "default_true")]
    pub restart: bool,
    /// Execute a single time step per execution
    #[serde(default)]
    pub do_step: bool,
    /// Force the system time step onto every time-stepping component
    ///
    /// Otherwise each component advances with its own time step.
    #[serde(default = "default_true", alias = "apply_time_step_to_disciplines")]
    pub apply_time_step_to_components: bool,
    #[serde(default)]
    pub algo_name: CycleSolverKind,
    #[serde(default)]
    pub mda_options: CycleSolverOptions,
}

impl Default for SystemOptions {
    /// A single unit step from zero
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

impl SystemOptions {
    pub fn new(final_time: impl Into<DurationValue>, time_step: impl Into<DurationValue>) -> Self {
        Self {
            initial_time: DurationValue::default(),
            final_time: final_time.into(),
            time_step: time_step.into(),
            restart: true,
            do_step: false,
            apply_time_step_to_components: true,
            algo_name: CycleSolverKind::default(),
            mda_options: CycleSolverOptions::default(),
        }
    }

    pub fn from_toml_str(contents: &str) -> CosimResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> CosimResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// The time grid described by the options
    ///
    /// A malformed duration string is reported as an invalid time grid.
    pub fn time_grid(&self) -> CosimResult<TimeGrid> {
        let resolve = |field: &str, value: &DurationValue| {
            value
                .to_duration()
                .map_err(|e| CosimError::InvalidTimeGrid(format!("{}: {}", field, e)))
        };
        TimeGrid::from_durations(
            resolve("initial_time", &self.initial_time)?,
            resolve("final_time", &self.final_time)?,
            resolve("time_step", &self.time_step)?,
        )
    }

    pub fn cycle_solver(&self) -> CosimResult<CycleSolver> {
        CycleSolver::new(self.algo_name, self.mda_options.clone())
    }
}
