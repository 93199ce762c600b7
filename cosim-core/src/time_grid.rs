//! Discretisation of the simulated interval.

use crate::duration::TimeDuration;
use crate::errors::{CosimError, CosimResult};
use crate::timeseries::Time;
use serde::{Deserialize, Serialize};

/// Time points at which the system is synchronised
///
/// The points are `t0 + k * dt` with the last point placed exactly at the final time.
/// When the interval is not a multiple of the step, the number of steps is rounded
/// half down, so that the last step has a length in `(dt / 2, 3 dt / 2]`.
/// For instance `(0, 10, 3)` gives `0, 3, 6, 10` and `(0, 10, 4)` gives `0, 4, 10`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeGrid {
    initial_time: Time,
    final_time: Time,
    time_step: Time,
    n_steps: usize,
}

impl TimeGrid {
    pub fn new(initial_time: Time, final_time: Time, time_step: Time) -> CosimResult<Self> {
        if !(initial_time.is_finite() && final_time.is_finite() && time_step.is_finite()) {
            return Err(CosimError::InvalidTimeGrid(format!(
                "times must be finite (initial={}, final={}, step={})",
                initial_time, final_time, time_step
            )));
        }
        if time_step <= 0.0 {
            return Err(CosimError::InvalidTimeGrid(format!(
                "the time step must be positive; got {}",
                time_step
            )));
        }
        if final_time <= initial_time {
            return Err(CosimError::InvalidTimeGrid(format!(
                "the final time ({}) must be greater than the initial time ({})",
                final_time, initial_time
            )));
        }

        let ratio = (final_time - initial_time) / time_step;
        let steps = (ratio - 0.5).ceil();
        if steps >= usize::MAX as f64 {
            return Err(CosimError::InvalidTimeGrid(format!(
                "too many steps from {} to {} with a step of {}",
                initial_time, final_time, time_step
            )));
        }
        let n_steps = (steps as usize).max(1);

        Ok(Self {
            initial_time,
            final_time,
            time_step,
            n_steps,
        })
    }

    /// Create a grid from durations expressed in seconds or as strings such as `"1h"`
    pub fn from_durations(
        initial_time: TimeDuration,
        final_time: TimeDuration,
        time_step: TimeDuration,
    ) -> CosimResult<Self> {
        Self::new(
            initial_time.seconds(),
            final_time.seconds(),
            time_step.seconds(),
        )
    }

    pub fn initial_time(&self) -> Time {
        self.initial_time
    }

    pub fn final_time(&self) -> Time {
        self.final_time
    }

    /// The nominal time step
    pub fn time_step(&self) -> Time {
        self.time_step
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// Number of time points, including the initial time
    pub fn len(&self) -> usize {
        self.n_steps + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// The `k`-th time point
    pub fn point(&self, k: usize) -> Option<Time> {
        match k {
            k if k == self.n_steps => Some(self.final_time),
            k if k < self.n_steps => Some(self.initial_time + k as Time * self.time_step),
            _ => None,
        }
    }

    /// Length of the step from point `k` to point `k + 1`
    pub fn step_size(&self, k: usize) -> Option<Time> {
        Some(self.point(k + 1)? - self.point(k)?)
    }

    pub fn points(&self) -> Vec<Time> {
        (0..self.len()).filter_map(|k| self.point(k)).collect()
    }
}
