//! State extraction functions for system components.

use crate::adapter::ComponentAdapter;
use crate::errors::{CosimError, CosimResult};
use crate::state::{InputState, VariableStore};
use crate::timeseries::Time;
use indexmap::IndexMap;

/// Extract the input state of a component from the latest known values.
///
/// Coupled inputs and evaluated external inputs are read from `values`.
/// Inputs without a value fall back to the default declared by the component.
pub fn extract_state(
    adapter: &ComponentAdapter,
    values: &VariableStore,
    t_current: Time,
) -> CosimResult<InputState> {
    let mut state = IndexMap::new();

    for definition in adapter.inputs() {
        let value = match (values.get(&definition.name), &definition.default) {
            (Some(value), _) => value.clone(),
            (None, Some(default)) => default.clone(),
            (None, None) => {
                return Err(CosimError::MissingExternalInput {
                    component: adapter.name().to_string(),
                    variable: definition.name.clone(),
                })
            }
        };
        state.insert(definition.name.clone(), value);
    }

    Ok(InputState::build(state, t_current))
}
