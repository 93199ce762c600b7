use crate::adapter::ComponentAdapter;
use crate::component::{
    downcast_state_mut, Component, ComponentKind, ComponentState, RequirementDefinition,
};
use crate::errors::{CosimError, CosimResult};
use crate::state::{InputState, OutputState, StateValue};
use crate::timeseries::{FloatValue, Time};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

pub(crate) fn adapt<C: Component + 'static>(component: C) -> ComponentAdapter {
    ComponentAdapter::new(Arc::new(component))
}

/// `output = factor * input + offset`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TestScale {
    input: String,
    output: String,
    factor: FloatValue,
    offset: FloatValue,
}

impl TestScale {
    pub fn new(input: &str, output: &str, factor: FloatValue) -> Self {
        Self {
            input: input.to_string(),
            output: output.to_string(),
            factor,
            offset: 0.0,
        }
    }

    pub fn with_offset(mut self, offset: FloatValue) -> Self {
        self.offset = offset;
        self
    }
}

#[typetag::serde]
impl Component for TestScale {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        vec![
            RequirementDefinition::scalar_input(&self.input),
            RequirementDefinition::scalar_output(&self.output),
        ]
    }

    fn execute(
        &self,
        _time: Time,
        _dt: Time,
        input_state: &InputState,
        _internal_state: &mut dyn ComponentState,
    ) -> CosimResult<OutputState> {
        let x = input_state.get_scalar(&self.input)?;
        let mut output = OutputState::new();
        output.insert(
            self.output.clone(),
            StateValue::Scalar(self.factor * x + self.offset),
        );
        Ok(output)
    }
}

/// Sum of several scalar inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TestSum {
    inputs: Vec<String>,
    output: String,
}

impl TestSum {
    pub fn new(inputs: &[&str], output: &str) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            output: output.to_string(),
        }
    }
}

#[typetag::serde]
impl Component for TestSum {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        let mut definitions: Vec<_> = self
            .inputs
            .iter()
            .map(|name| RequirementDefinition::scalar_input(name))
            .collect();
        definitions.push(RequirementDefinition::scalar_output(&self.output));
        definitions
    }

    fn execute(
        &self,
        _time: Time,
        _dt: Time,
        input_state: &InputState,
        _internal_state: &mut dyn ComponentState,
    ) -> CosimResult<OutputState> {
        let mut total = 0.0;
        for name in &self.inputs {
            total += input_state.get_scalar(name)?;
        }
        let mut output = OutputState::new();
        output.insert(self.output.clone(), StateValue::Scalar(total));
        Ok(output)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct AccumulatorState {
    total: FloatValue,
}

#[typetag::serde]
impl ComponentState for AccumulatorState {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn clone_state(&self) -> Box<dyn ComponentState> {
        Box::new(self.clone())
    }
}

/// Explicit Euler integration of the input
///
/// The output is the integral at the end of the step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TestAccumulator {
    input: String,
    output: String,
    time_step: Option<Time>,
}

impl TestAccumulator {
    pub fn new(input: &str, output: &str) -> Self {
        Self {
            input: input.to_string(),
            output: output.to_string(),
            time_step: None,
        }
    }

    pub fn with_time_step(mut self, time_step: Time) -> Self {
        self.time_step = Some(time_step);
        self
    }
}

#[typetag::serde]
impl Component for TestAccumulator {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        vec![
            RequirementDefinition::scalar_input(&self.input),
            RequirementDefinition::scalar_output(&self.output),
        ]
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::TimeStepping
    }

    fn native_time_step(&self) -> Option<Time> {
        self.time_step
    }

    fn create_initial_state(&self) -> Box<dyn ComponentState> {
        Box::new(AccumulatorState::default())
    }

    fn execute(
        &self,
        _time: Time,
        dt: Time,
        input_state: &InputState,
        internal_state: &mut dyn ComponentState,
    ) -> CosimResult<OutputState> {
        let state = downcast_state_mut::<AccumulatorState>(internal_state, "TestAccumulator")?;
        state.total += input_state.get_scalar(&self.input)? * dt;

        let mut output = OutputState::new();
        output.insert(self.output.clone(), StateValue::Scalar(state.total));
        Ok(output)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ClockState {
    calls: usize,
}

#[typetag::serde]
impl ComponentState for ClockState {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn clone_state(&self) -> Box<dyn ComponentState> {
        Box::new(self.clone())
    }
}

/// Reports how many times it was executed and the end time of the last execution
///
/// Outputs are `{prefix}_calls` and `{prefix}_time`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TestClock {
    prefix: String,
    time_step: Option<Time>,
}

impl TestClock {
    pub fn new(prefix: &str, time_step: Option<Time>) -> Self {
        Self {
            prefix: prefix.to_string(),
            time_step,
        }
    }
}

#[typetag::serde]
impl Component for TestClock {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        vec![
            RequirementDefinition::scalar_output(&format!("{}_calls", self.prefix)),
            RequirementDefinition::scalar_output(&format!("{}_time", self.prefix)),
        ]
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::TimeStepping
    }

    fn native_time_step(&self) -> Option<Time> {
        self.time_step
    }

    fn create_initial_state(&self) -> Box<dyn ComponentState> {
        Box::new(ClockState::default())
    }

    fn execute(
        &self,
        time: Time,
        dt: Time,
        _input_state: &InputState,
        internal_state: &mut dyn ComponentState,
    ) -> CosimResult<OutputState> {
        let state = downcast_state_mut::<ClockState>(internal_state, "TestClock")?;
        state.calls += 1;

        let mut output = OutputState::new();
        output.insert(
            format!("{}_calls", self.prefix),
            StateValue::Scalar(state.calls as FloatValue),
        );
        output.insert(
            format!("{}_time", self.prefix),
            StateValue::Scalar(time + dt),
        );
        Ok(output)
    }
}

/// Copies its input until `fail_at`, then fails
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TestFailing {
    input: String,
    output: String,
    fail_at: Time,
}

impl TestFailing {
    pub fn new(input: &str, output: &str, fail_at: Time) -> Self {
        Self {
            input: input.to_string(),
            output: output.to_string(),
            fail_at,
        }
    }
}

#[typetag::serde]
impl Component for TestFailing {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        vec![
            RequirementDefinition::scalar_input(&self.input),
            RequirementDefinition::scalar_output(&self.output),
        ]
    }

    fn execute(
        &self,
        time: Time,
        _dt: Time,
        input_state: &InputState,
        _internal_state: &mut dyn ComponentState,
    ) -> CosimResult<OutputState> {
        if time >= self.fail_at {
            return Err(CosimError::Error(format!("refusing to run at t={}", time)));
        }
        let mut output = OutputState::new();
        output.insert(
            self.output.clone(),
            input_state.get(&self.input)?.clone(),
        );
        Ok(output)
    }
}

/// Doubles an array input
///
/// The declared output length may differ from the input length to exercise shape checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TestVectorScale {
    input: String,
    output: String,
    input_len: usize,
    output_len: usize,
}

impl TestVectorScale {
    pub fn new(input: &str, output: &str, len: usize) -> Self {
        Self {
            input: input.to_string(),
            output: output.to_string(),
            input_len: len,
            output_len: len,
        }
    }

    pub fn inconsistent(input: &str, output: &str) -> Self {
        Self {
            input: input.to_string(),
            output: output.to_string(),
            input_len: 2,
            output_len: 3,
        }
    }
}

#[typetag::serde]
impl Component for TestVectorScale {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        vec![
            RequirementDefinition::array_input(&self.input, self.input_len),
            RequirementDefinition::array_output(&self.output, self.output_len),
        ]
    }

    fn execute(
        &self,
        _time: Time,
        _dt: Time,
        input_state: &InputState,
        _internal_state: &mut dyn ComponentState,
    ) -> CosimResult<OutputState> {
        let values: Array1<FloatValue> = match input_state.get(&self.input)? {
            StateValue::Array(values) => values * 2.0,
            StateValue::Scalar(_) => {
                return Err(CosimError::Error(format!(
                    "'{}' must be an array",
                    self.input
                )))
            }
        };
        let mut output = OutputState::new();
        output.insert(self.output.clone(), StateValue::Array(values));
        Ok(output)
    }
}
