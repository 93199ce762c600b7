//! Integrator component
//!
//! A time-stepping component accumulating the integral of its input with the explicit
//! Euler scheme.

use cosim_core::component::{
    downcast_state_mut, Component, ComponentKind, ComponentState, RequirementDefinition,
};
use cosim_core::errors::CosimResult;
use cosim_core::state::{InputState, OutputState, StateValue};
use cosim_core::timeseries::{FloatValue, Time};
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Parameters for the integrator component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegratorParameters {
    pub input: String,
    pub output: String,
    /// Value of the integral at the initial time
    #[serde(default)]
    pub initial_value: FloatValue,
    #[serde(default = "default_gain")]
    pub gain: FloatValue,
    /// Time step used when the system does not impose its own
    #[serde(default)]
    pub time_step: Option<Time>,
}

fn default_gain() -> FloatValue {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegratorState {
    pub value: FloatValue,
}

#[typetag::serde]
impl ComponentState for IntegratorState {
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

/// Explicit Euler integration of a scalar input
///
/// $$ y_{k+1} = y_k + g \, u \, \Delta t $$
///
/// The input is held constant over the step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integrator {
    parameters: IntegratorParameters,
}

impl Integrator {
    pub fn from_parameters(parameters: IntegratorParameters) -> Self {
        Self { parameters }
    }

    /// Integrate `input` into `output`, starting from zero
    pub fn new(input: &str, output: &str) -> Self {
        Self::from_parameters(IntegratorParameters {
            input: input.to_string(),
            output: output.to_string(),
            initial_value: 0.0,
            gain: 1.0,
            time_step: None,
        })
    }
}

#[typetag::serde]
impl Component for Integrator {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        vec![
            RequirementDefinition::scalar_input(&self.parameters.input),
            RequirementDefinition::scalar_output(&self.parameters.output)
                .with_default(self.parameters.initial_value),
        ]
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::TimeStepping
    }

    fn native_time_step(&self) -> Option<Time> {
        self.parameters.time_step
    }

    fn create_initial_state(&self) -> Box<dyn ComponentState> {
        Box::new(IntegratorState {
            value: self.parameters.initial_value,
        })
    }

    fn execute(
        &self,
        _time: Time,
        dt: Time,
        input_state: &InputState,
        internal_state: &mut dyn ComponentState,
    ) -> CosimResult<OutputState> {
        let u = input_state.get_scalar(&self.parameters.input)?;
        let state = downcast_state_mut::<IntegratorState>(internal_state, "Integrator")?;
        state.value += self.parameters.gain * u * dt;

        let mut output = OutputState::new();
        output.insert(
            self.parameters.output.clone(),
            StateValue::Scalar(state.value),
        );
        Ok(output)
    }
}
