//! Linear combination component
//!
//! A static component returning a weighted sum of its scalar inputs.

use cosim_core::component::{Component, ComponentState, RequirementDefinition};
use cosim_core::errors::{CosimError, CosimResult};
use cosim_core::state::{InputState, OutputState, StateValue};
use cosim_core::timeseries::{FloatValue, Time};
use serde::{Deserialize, Serialize};

/// Parameters for the linear combination component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearCombinationParameters {
    pub inputs: Vec<String>,
    /// One coefficient per input
    pub coefficients: Vec<FloatValue>,
    #[serde(default)]
    pub offset: FloatValue,
    pub output: String,
}

/// Weighted sum of scalar inputs
///
/// $$ y = c_0 + \sum_i c_i x_i $$
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearCombination {
    parameters: LinearCombinationParameters,
}

impl LinearCombination {
    /// Create a new linear combination from parameters
    ///
    /// Fails if the number of coefficients does not match the number of inputs.
    pub fn from_parameters(parameters: LinearCombinationParameters) -> CosimResult<Self> {
        if parameters.inputs.len() != parameters.coefficients.len() {
            return Err(CosimError::InvalidOption(format!(
                "{} coefficients given for {} inputs",
                parameters.coefficients.len(),
                parameters.inputs.len()
            )));
        }
        Ok(Self { parameters })
    }

    /// The sum of the inputs, each with a unit coefficient
    pub fn sum(inputs: &[&str], output: &str) -> Self {
        Self {
            parameters: LinearCombinationParameters {
                inputs: inputs.iter().map(|s| s.to_string()).collect(),
                coefficients: vec![1.0; inputs.len()],
                offset: 0.0,
                output: output.to_string(),
            },
        }
    }

    pub fn calculate(&self, values: &[FloatValue]) -> FloatValue {
        self.parameters.offset
            + values
                .iter()
                .zip(&self.parameters.coefficients)
                .map(|(x, c)| c * x)
                .sum::<FloatValue>()
    }
}

#[typetag::serde]
impl Component for LinearCombination {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        let mut definitions: Vec<_> = self
            .parameters
            .inputs
            .iter()
            .map(|name| RequirementDefinition::scalar_input(name))
            .collect();
        definitions.push(RequirementDefinition::scalar_output(&self.parameters.output));
        definitions
    }

    fn execute(
        &self,
        _time: Time,
        _dt: Time,
        input_state: &InputState,
        _internal_state: &mut dyn ComponentState,
    ) -> CosimResult<OutputState> {
        let values = self
            .parameters
            .inputs
            .iter()
            .map(|name| input_state.get_scalar(name))
            .collect::<CosimResult<Vec<_>>>()?;

        let mut output = OutputState::new();
        output.insert(
            self.parameters.output.clone(),
            StateValue::Scalar(self.calculate(&values)),
        );
        Ok(output)
    }
}
