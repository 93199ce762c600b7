//! The contract between the orchestration engine and a simulation component.
//!
//! A component declares a set of named inputs and outputs.
//! Variables are coupled between components by name: an output of one component feeds
//! every input with the same name.
//! Inputs which no component produces are driven externally.
//!
//! Components come in two kinds:
//! - [`ComponentKind::Static`] components are pure functions of their inputs.
//! - [`ComponentKind::TimeStepping`] components carry an internal state which is advanced
//!   by a time step on every call.
//!
//! Internal state is never stored on the component itself.
//! It is created by [`Component::create_initial_state`] and owned by whoever drives the
//! component, which makes snapshots and restarts trivial.

use crate::errors::{CosimError, CosimResult};
use crate::state::{InputState, OutputState, Shape, StateValue};
use crate::timeseries::Time;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::Debug;

#[derive(Debug, Eq, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum RequirementType {
    Input,
    Output,
}

/// Declaration of a single input or output of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementDefinition {
    pub name: String,
    pub shape: Shape,
    pub requirement_type: RequirementType,
    /// Value used for an input when nothing else provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<StateValue>,
}

impl RequirementDefinition {
    pub fn new(name: &str, shape: Shape, requirement_type: RequirementType) -> Self {
        Self {
            name: name.to_string(),
            shape,
            requirement_type,
            default: None,
        }
    }

    pub fn scalar_input(name: &str) -> Self {
        Self::new(name, Shape::Scalar, RequirementType::Input)
    }

    pub fn scalar_output(name: &str) -> Self {
        Self::new(name, Shape::Scalar, RequirementType::Output)
    }

    pub fn array_input(name: &str, len: usize) -> Self {
        Self::new(name, Shape::Array(len), RequirementType::Input)
    }

    pub fn array_output(name: &str, len: usize) -> Self {
        Self::new(name, Shape::Array(len), RequirementType::Output)
    }

    /// Attach a default value
    ///
    /// For inputs, the default is used when the input is neither coupled nor externally
    /// driven.
    /// For outputs, it is the value published before the component is first evaluated.
    pub fn with_default(mut self, value: impl Into<StateValue>) -> Self {
        self.default = Some(value.into());
        self
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Copy, Default, Serialize, Deserialize)]
pub enum ComponentKind {
    /// Outputs are a pure function of the inputs
    #[default]
    Static,
    /// Outputs depend on the inputs and on an internal state advanced by the time step
    TimeStepping,
}

/// Internal state of a component
///
/// Implementations are plain data.
/// The `clone_state` method allows snapshots to be taken through a trait object.
#[typetag::serde(tag = "state_type")]
pub trait ComponentState: Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clone_state(&self) -> Box<dyn ComponentState>;
}

impl Clone for Box<dyn ComponentState> {
    fn clone(&self) -> Self {
        self.clone_state()
    }
}

/// State of a component which has no internal state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoState {}

#[typetag::serde(name = "none")]
impl ComponentState for NoState {
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

/// Downcast an internal state to the concrete type expected by a component
pub fn downcast_state_mut<'a, T: 'static>(
    state: &'a mut dyn ComponentState,
    component: &str,
) -> CosimResult<&'a mut T> {
    state
        .as_any_mut()
        .downcast_mut::<T>()
        .ok_or_else(|| CosimError::InvalidState(component.to_string()))
}

/// Component of a coupled system
///
/// A component declares its inputs and outputs and computes the outputs for a time step.
#[typetag::serde(tag = "type")]
pub trait Component: Debug + Send + Sync {
    /// Declared inputs and outputs, in declaration order
    fn definitions(&self) -> Vec<RequirementDefinition>;

    fn kind(&self) -> ComponentKind {
        ComponentKind::Static
    }

    /// The time step the component uses when it is not forced to follow the system
    fn native_time_step(&self) -> Option<Time> {
        None
    }

    fn create_initial_state(&self) -> Box<dyn ComponentState> {
        Box::new(NoState {})
    }

    /// Compute the outputs of the component
    ///
    /// `time` is the start of the step and `dt` its length.
    /// Time-stepping components advance `internal_state` from `time` to `time + dt` and
    /// return the outputs at the end of the step.
    /// Static components ignore `dt` and the internal state.
    fn execute(
        &self,
        time: Time,
        dt: Time,
        input_state: &InputState,
        internal_state: &mut dyn ComponentState,
    ) -> CosimResult<OutputState>;

    /// Name used in logs and error messages
    ///
    /// Defaults to the type name taken from the `Debug` representation.
    fn name(&self) -> String {
        let debug = format!("{:?}", self);
        debug
            .split(['{', ' ', '('])
            .next()
            .unwrap_or("UnknownComponent")
            .to_string()
    }

    fn inputs(&self) -> Vec<RequirementDefinition> {
        self.definitions()
            .into_iter()
            .filter(|d| d.requirement_type == RequirementType::Input)
            .collect()
    }

    fn outputs(&self) -> Vec<RequirementDefinition> {
        self.definitions()
            .into_iter()
            .filter(|d| d.requirement_type == RequirementType::Output)
            .collect()
    }

    fn input_names(&self) -> Vec<String> {
        self.inputs().into_iter().map(|d| d.name).collect()
    }

    fn output_names(&self) -> Vec<String> {
        self.outputs().into_iter().map(|d| d.name).collect()
    }
}
