//! Sellar problem
//!
//! A classic multidisciplinary analysis with two coupled disciplines:
//!
//! $$ y_1 = \sqrt{z_1^2 + z_2 + x - 0.2 y_2} $$
//! $$ y_2 = |y_1| + z_1 + z_2 $$
//!
//! and a system discipline computing the objective and the constraints:
//!
//! $$ obj = x^2 + z_2 + y_1^2 + e^{-y_2} $$
//! $$ c_1 = 3.16 - y_1^2 $$
//! $$ c_2 = y_2 - 24 $$
//!
//! [`Sellar1`] and [`Sellar2`] form a cyclic group.
//! The design variables default to $x = 1$ and $z = (4, 3)$.

use cosim_core::component::{Component, ComponentState, RequirementDefinition};
use cosim_core::errors::{CosimError, CosimResult};
use cosim_core::state::{InputState, OutputState, StateValue};
use cosim_core::timeseries::{FloatValue, Time};
use serde::{Deserialize, Serialize};

pub const VAR_Y_1: &str = "y_1";
pub const VAR_Y_2: &str = "y_2";
pub const VAR_X_LOCAL: &str = "x_local";
pub const VAR_X_SHARED_1: &str = "x_shared_1";
pub const VAR_X_SHARED_2: &str = "x_shared_2";
pub const VAR_OBJ: &str = "obj";
pub const VAR_C_1: &str = "c_1";
pub const VAR_C_2: &str = "c_2";

const DEFAULT_X_LOCAL: FloatValue = 1.0;
const DEFAULT_X_SHARED_1: FloatValue = 4.0;
const DEFAULT_X_SHARED_2: FloatValue = 3.0;

fn design_variables() -> [RequirementDefinition; 3] {
    [
        RequirementDefinition::scalar_input(VAR_X_LOCAL).with_default(DEFAULT_X_LOCAL),
        RequirementDefinition::scalar_input(VAR_X_SHARED_1).with_default(DEFAULT_X_SHARED_1),
        RequirementDefinition::scalar_input(VAR_X_SHARED_2).with_default(DEFAULT_X_SHARED_2),
    ]
}

/// Computes $y_1$ from $y_2$
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sellar1 {}

impl Sellar1 {
    pub fn calculate_y_1(
        x_local: FloatValue,
        x_shared_1: FloatValue,
        x_shared_2: FloatValue,
        y_2: FloatValue,
    ) -> CosimResult<FloatValue> {
        let squared = x_shared_1.powi(2) + x_shared_2 + x_local - 0.2 * y_2;
        if squared < 0.0 {
            return Err(CosimError::Error(format!(
                "y_1 is undefined: its square is negative ({})",
                squared
            )));
        }
        Ok(squared.sqrt())
    }
}

#[typetag::serde]
impl Component for Sellar1 {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        let mut definitions = design_variables().to_vec();
        definitions.push(RequirementDefinition::scalar_input(VAR_Y_2).with_default(1.0));
        definitions.push(RequirementDefinition::scalar_output(VAR_Y_1).with_default(1.0));
        definitions
    }

    fn execute(
        &self,
        _time: Time,
        _dt: Time,
        input_state: &InputState,
        _internal_state: &mut dyn ComponentState,
    ) -> CosimResult<OutputState> {
        let y_1 = Self::calculate_y_1(
            input_state.get_scalar(VAR_X_LOCAL)?,
            input_state.get_scalar(VAR_X_SHARED_1)?,
            input_state.get_scalar(VAR_X_SHARED_2)?,
            input_state.get_scalar(VAR_Y_2)?,
        )?;

        let mut output = OutputState::new();
        output.insert(VAR_Y_1.to_string(), StateValue::Scalar(y_1));
        Ok(output)
    }
}

/// Computes $y_2$ from $y_1$
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sellar2 {}

impl Sellar2 {
    pub fn calculate_y_2(
        x_shared_1: FloatValue,
        x_shared_2: FloatValue,
        y_1: FloatValue,
    ) -> FloatValue {
        x_shared_1 + x_shared_2 + y_1.abs()
    }
}

#[typetag::serde]
impl Component for Sellar2 {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        let [_, x_shared_1, x_shared_2] = design_variables();
        vec![
            x_shared_1,
            x_shared_2,
            RequirementDefinition::scalar_input(VAR_Y_1).with_default(1.0),
            RequirementDefinition::scalar_output(VAR_Y_2).with_default(1.0),
        ]
    }

    fn execute(
        &self,
        _time: Time,
        _dt: Time,
        input_state: &InputState,
        _internal_state: &mut dyn ComponentState,
    ) -> CosimResult<OutputState> {
        let y_2 = Self::calculate_y_2(
            input_state.get_scalar(VAR_X_SHARED_1)?,
            input_state.get_scalar(VAR_X_SHARED_2)?,
            input_state.get_scalar(VAR_Y_1)?,
        );

        let mut output = OutputState::new();
        output.insert(VAR_Y_2.to_string(), StateValue::Scalar(y_2));
        Ok(output)
    }
}

/// Computes the objective and the constraints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SellarSystem {}

#[typetag::serde]
impl Component for SellarSystem {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        let [x_local, _, x_shared_2] = design_variables();
        vec![
            x_local,
            x_shared_2,
            RequirementDefinition::scalar_input(VAR_Y_1),
            RequirementDefinition::scalar_input(VAR_Y_2),
            RequirementDefinition::scalar_output(VAR_OBJ),
            RequirementDefinition::scalar_output(VAR_C_1),
            RequirementDefinition::scalar_output(VAR_C_2),
        ]
    }

    fn execute(
        &self,
        _time: Time,
        _dt: Time,
        input_state: &InputState,
        _internal_state: &mut dyn ComponentState,
    ) -> CosimResult<OutputState> {
        let x_local = input_state.get_scalar(VAR_X_LOCAL)?;
        let x_shared_2 = input_state.get_scalar(VAR_X_SHARED_2)?;
        let y_1 = input_state.get_scalar(VAR_Y_1)?;
        let y_2 = input_state.get_scalar(VAR_Y_2)?;

        let mut output = OutputState::new();
        output.insert(
            VAR_OBJ.to_string(),
            StateValue::Scalar(x_local.powi(2) + x_shared_2 + y_1.powi(2) + (-y_2).exp()),
        );
        output.insert(VAR_C_1.to_string(), StateValue::Scalar(3.16 - y_1.powi(2)));
        output.insert(VAR_C_2.to_string(), StateValue::Scalar(y_2 - 24.0));
        Ok(output)
    }
}
