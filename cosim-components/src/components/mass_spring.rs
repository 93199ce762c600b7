//! Mass-spring components
//!
//! Two masses are attached to fixed walls and to each other by springs:
//!
//! ```text
//! |--k1--[m1]--kc--[m2]--k2--|
//! ```
//!
//! [`MassSpringSystem`] integrates the four states of the problem at once.
//! The same problem can be split into two [`MassSpringSubsystem`]s, each integrating
//! a single mass and reading the position of the other mass as an input.
//! Coupled together they form a cyclic group.

use cosim_core::component::{
    downcast_state_mut, Component, ComponentKind, ComponentState, RequirementDefinition,
};
use cosim_core::errors::CosimResult;
use cosim_core::ivp::{IVPBuilder, IVP};
use cosim_core::state::{InputState, OutputState, StateValue};
use cosim_core::timeseries::{FloatValue, Time};
use ode_solvers::{Vector2, Vector4};
use serde::{Deserialize, Serialize};
use std::any::Any;

type SubsystemState = Vector2<FloatValue>;
type SystemState = Vector4<FloatValue>;

const VAR_POSITION_1: &str = "x1";
const VAR_VELOCITY_1: &str = "v1";
const VAR_POSITION_2: &str = "x2";
const VAR_VELOCITY_2: &str = "v2";

/// Parameters of a single mass and of the spring attaching it to its wall
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassParameters {
    /// unit: kg
    pub mass: FloatValue,
    /// unit: N / m
    pub stiffness: FloatValue,
    /// unit: m
    #[serde(default)]
    pub initial_position: FloatValue,
    /// unit: m / s
    #[serde(default)]
    pub initial_velocity: FloatValue,
}

/// Parameters of the two-mass problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassSpringParameters {
    pub first: MassParameters,
    pub second: MassParameters,
    /// Stiffness of the spring between the two masses
    /// unit: N / m
    pub coupling_stiffness: FloatValue,
}

impl Default for MassSpringParameters {
    /// Unit masses and springs, with the first mass displaced by 1 m
    fn default() -> Self {
        Self {
            first: MassParameters {
                mass: 1.0,
                stiffness: 1.0,
                initial_position: 1.0,
                initial_velocity: 0.0,
            },
            second: MassParameters {
                mass: 1.0,
                stiffness: 1.0,
                initial_position: 0.0,
                initial_velocity: 0.0,
            },
            coupling_stiffness: 1.0,
        }
    }
}

impl MassSpringParameters {
    /// The two subsystems which together form the problem
    pub fn subsystems(&self) -> (MassSpringSubsystem, MassSpringSubsystem) {
        (
            MassSpringSubsystem::first(self.first.clone(), self.coupling_stiffness),
            MassSpringSubsystem::second(self.second.clone(), self.coupling_stiffness),
        )
    }
}

/// Acceleration of a mass
fn acceleration(
    mass: &MassParameters,
    coupling_stiffness: FloatValue,
    position: FloatValue,
    other_position: FloatValue,
) -> FloatValue {
    (-mass.stiffness * position - coupling_stiffness * (position - other_position)) / mass.mass
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassState {
    pub position: FloatValue,
    pub velocity: FloatValue,
}

#[typetag::serde]
impl ComponentState for MassState {
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

/// A single mass driven by the position of the other mass
///
/// $$ m \ddot{x} = -k x - k_c (x - x_{other}) $$
///
/// The position of the other mass is held constant over a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MassSpringSubsystem {
    parameters: MassParameters,
    coupling_stiffness: FloatValue,
    position: String,
    velocity: String,
    other_position: String,
    time_step: Option<Time>,
}

impl MassSpringSubsystem {
    pub fn new(
        parameters: MassParameters,
        coupling_stiffness: FloatValue,
        position: &str,
        velocity: &str,
        other_position: &str,
    ) -> Self {
        Self {
            parameters,
            coupling_stiffness,
            position: position.to_string(),
            velocity: velocity.to_string(),
            other_position: other_position.to_string(),
            time_step: None,
        }
    }

    /// The first mass, producing `x1` and `v1` from `x2`
    pub fn first(parameters: MassParameters, coupling_stiffness: FloatValue) -> Self {
        Self::new(
            parameters,
            coupling_stiffness,
            VAR_POSITION_1,
            VAR_VELOCITY_1,
            VAR_POSITION_2,
        )
    }

    /// The second mass, producing `x2` and `v2` from `x1`
    pub fn second(parameters: MassParameters, coupling_stiffness: FloatValue) -> Self {
        Self::new(
            parameters,
            coupling_stiffness,
            VAR_POSITION_2,
            VAR_VELOCITY_2,
            VAR_POSITION_1,
        )
    }

    /// Use a native time step when the system lets components follow their own cadence
    pub fn with_time_step(mut self, time_step: Time) -> Self {
        self.time_step = Some(time_step);
        self
    }
}

#[typetag::serde]
impl Component for MassSpringSubsystem {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        vec![
            RequirementDefinition::scalar_input(&self.other_position),
            RequirementDefinition::scalar_output(&self.position)
                .with_default(self.parameters.initial_position),
            RequirementDefinition::scalar_output(&self.velocity)
                .with_default(self.parameters.initial_velocity),
        ]
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::TimeStepping
    }

    fn native_time_step(&self) -> Option<Time> {
        self.time_step
    }

    fn create_initial_state(&self) -> Box<dyn ComponentState> {
        Box::new(MassState {
            position: self.parameters.initial_position,
            velocity: self.parameters.initial_velocity,
        })
    }

    fn execute(
        &self,
        time: Time,
        dt: Time,
        input_state: &InputState,
        internal_state: &mut dyn ComponentState,
    ) -> CosimResult<OutputState> {
        // Validates the input read by `calculate_dy_dt`
        input_state.get_scalar(&self.other_position)?;
        let state = downcast_state_mut::<MassState>(internal_state, "MassSpringSubsystem")?;

        let y0 = SubsystemState::new(state.position, state.velocity);
        let y = IVPBuilder::new(self, input_state, y0).integrate(time, time + dt)?;
        state.position = y[0];
        state.velocity = y[1];

        let mut output = OutputState::new();
        output.insert(self.position.clone(), StateValue::Scalar(state.position));
        output.insert(self.velocity.clone(), StateValue::Scalar(state.velocity));
        Ok(output)
    }
}

impl IVP<Time, SubsystemState> for MassSpringSubsystem {
    fn calculate_dy_dt(
        &self,
        _t: Time,
        input_state: &InputState,
        y: &SubsystemState,
        dy_dt: &mut SubsystemState,
    ) {
        let other_position = input_state
            .get_scalar(&self.other_position)
            .unwrap_or_default();

        dy_dt[0] = y[1];
        dy_dt[1] = acceleration(&self.parameters, self.coupling_stiffness, y[0], other_position);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassSpringSystemState {
    pub x1: FloatValue,
    pub v1: FloatValue,
    pub x2: FloatValue,
    pub v2: FloatValue,
}

#[typetag::serde]
impl ComponentState for MassSpringSystemState {
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

/// Both masses integrated together
///
/// Produces `x1`, `v1`, `x2` and `v2` without any input.
/// It serves as a reference for the coupled subsystems.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MassSpringSystem {
    parameters: MassSpringParameters,
}

impl MassSpringSystem {
    pub fn from_parameters(parameters: MassSpringParameters) -> Self {
        Self { parameters }
    }
}

#[typetag::serde]
impl Component for MassSpringSystem {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        vec![
            RequirementDefinition::scalar_output(VAR_POSITION_1)
                .with_default(self.parameters.first.initial_position),
            RequirementDefinition::scalar_output(VAR_VELOCITY_1)
                .with_default(self.parameters.first.initial_velocity),
            RequirementDefinition::scalar_output(VAR_POSITION_2)
                .with_default(self.parameters.second.initial_position),
            RequirementDefinition::scalar_output(VAR_VELOCITY_2)
                .with_default(self.parameters.second.initial_velocity),
        ]
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::TimeStepping
    }

    fn create_initial_state(&self) -> Box<dyn ComponentState> {
        Box::new(MassSpringSystemState {
            x1: self.parameters.first.initial_position,
            v1: self.parameters.first.initial_velocity,
            x2: self.parameters.second.initial_position,
            v2: self.parameters.second.initial_velocity,
        })
    }

    fn execute(
        &self,
        time: Time,
        dt: Time,
        input_state: &InputState,
        internal_state: &mut dyn ComponentState,
    ) -> CosimResult<OutputState> {
        let state =
            downcast_state_mut::<MassSpringSystemState>(internal_state, "MassSpringSystem")?;

        let y0 = SystemState::new(state.x1, state.v1, state.x2, state.v2);
        let y = IVPBuilder::new(self, input_state, y0).integrate(time, time + dt)?;
        state.x1 = y[0];
        state.v1 = y[1];
        state.x2 = y[2];
        state.v2 = y[3];

        let mut output = OutputState::new();
        output.insert(VAR_POSITION_1.to_string(), StateValue::Scalar(state.x1));
        output.insert(VAR_VELOCITY_1.to_string(), StateValue::Scalar(state.v1));
        output.insert(VAR_POSITION_2.to_string(), StateValue::Scalar(state.x2));
        output.insert(VAR_VELOCITY_2.to_string(), StateValue::Scalar(state.v2));
        Ok(output)
    }
}

impl IVP<Time, SystemState> for MassSpringSystem {
    fn calculate_dy_dt(
        &self,
        _t: Time,
        _input_state: &InputState,
        y: &SystemState,
        dy_dt: &mut SystemState,
    ) {
        let coupling_stiffness = self.parameters.coupling_stiffness;

        dy_dt[0] = y[1];
        dy_dt[1] = acceleration(&self.parameters.first, coupling_stiffness, y[0], y[2]);
        dy_dt[2] = y[3];
        dy_dt[3] = acceleration(&self.parameters.second, coupling_stiffness, y[2], y[0]);
    }
}
