//! Type definitions for the system module.

use crate::component::ComponentState;
use crate::state::{StateValue, VariableStore};
use crate::timeseries::{FloatValue, Time};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Lifecycle of a system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    /// A single step was executed and the system waits for the next call
    StepComplete,
    /// The final time has been reached
    Finished,
    /// A step failed; the system must be restarted
    Failed,
}

/// Everything the system needs to carry from one step to the next
///
/// The internal states of the components are held by their adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    pub current_time: Time,
    /// Number of steps taken since the initial time
    pub step_index: usize,
    /// Largest number of iterations used by a cyclic group during the last step
    pub iterations: usize,
    /// Whether every cyclic group met its tolerance during the last step
    pub converged: bool,
    /// Latest value of the coupling variables and of the evaluated external inputs
    pub values: VariableStore,
    /// Time reached by each component, in declaration order
    pub component_times: Vec<Time>,
}

/// Values recorded at the end of every step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResults {
    times: Vec<Time>,
    values: IndexMap<String, Vec<StateValue>>,
}

impl SimulationResults {
    pub(crate) fn record(&mut self, time: Time, values: &VariableStore) {
        self.times.push(time);
        for (name, value) in values {
            self.values
                .entry(name.clone())
                .or_default()
                .push(value.clone());
        }
    }

    pub(crate) fn clear(&mut self) {
        self.times.clear();
        self.values.clear();
    }

    /// Times at which values were recorded
    pub fn times(&self) -> &[Time] {
        &self.times
    }

    pub fn get(&self, name: &str) -> Option<&[StateValue]> {
        self.values.get(name).map(|v| v.as_slice())
    }

    /// History of a scalar variable
    ///
    /// Returns `None` if the variable is unknown or not a scalar.
    pub fn scalar(&self, name: &str) -> Option<Vec<FloatValue>> {
        self.values
            .get(name)?
            .iter()
            .map(StateValue::as_scalar)
            .collect()
    }

    /// Most recent value of a variable
    pub fn last(&self, name: &str) -> Option<&StateValue> {
        self.values.get(name)?.last()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// A copy of the full state of a system
///
/// Restoring a snapshot resumes the simulation from the point it was taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub status: RunStatus,
    pub state: ExecutionState,
    pub component_states: Vec<Box<dyn ComponentState>>,
    pub results: SimulationResults,
}
