//! Uniform wrapper around a component and its internal state.

use crate::component::{Component, ComponentKind, ComponentState, RequirementDefinition};
use crate::errors::{CosimError, CosimResult};
use crate::state::{InputState, OutputState};
use crate::timeseries::Time;
use log::trace;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Loads components stored outside of the process, e.g. model exchange archives
///
/// No loader is provided by this crate.
pub trait ComponentLoader: Send + Sync {
    fn load(&self, path: &Path) -> CosimResult<Arc<dyn Component>>;
}

/// Where a component comes from
#[derive(Clone)]
pub enum ComponentSource {
    FilePath(PathBuf),
    InMemory(Arc<dyn Component>),
}

impl fmt::Debug for ComponentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentSource::FilePath(path) => f.debug_tuple("FilePath").field(path).finish(),
            ComponentSource::InMemory(component) => {
                f.debug_tuple("InMemory").field(&component.name()).finish()
            }
        }
    }
}

impl From<Arc<dyn Component>> for ComponentSource {
    fn from(value: Arc<dyn Component>) -> Self {
        ComponentSource::InMemory(value)
    }
}

impl From<PathBuf> for ComponentSource {
    fn from(value: PathBuf) -> Self {
        ComponentSource::FilePath(value)
    }
}

impl ComponentSource {
    /// Resolve the source into a component
    pub fn resolve(&self, loader: Option<&dyn ComponentLoader>) -> CosimResult<Arc<dyn Component>> {
        match self {
            ComponentSource::InMemory(component) => Ok(component.clone()),
            ComponentSource::FilePath(path) => match loader {
                Some(loader) => loader.load(path),
                None => Err(CosimError::UnsupportedSource(path.display().to_string())),
            },
        }
    }
}

/// A component together with the internal state it is executed against
///
/// The adapter checks every value crossing the boundary of the component against the
/// declared shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentAdapter {
    component: Arc<dyn Component>,
    name: String,
    inputs: Vec<RequirementDefinition>,
    outputs: Vec<RequirementDefinition>,
    kind: ComponentKind,
    /// Time step used when the component follows its own cadence
    time_step: Option<Time>,
    state: Box<dyn ComponentState>,
}

impl ComponentAdapter {
    pub fn new(component: Arc<dyn Component>) -> Self {
        let name = component.name();
        let inputs = component.inputs();
        let outputs = component.outputs();
        let kind = component.kind();
        let time_step = component.native_time_step();
        let state = component.create_initial_state();
        Self {
            component,
            name,
            inputs,
            outputs,
            kind,
            time_step,
            state,
        }
    }

    /// Override the name used in logs and error messages
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Override the native time step of the component
    pub fn set_time_step(&mut self, time_step: Option<Time>) {
        self.time_step = time_step;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[RequirementDefinition] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[RequirementDefinition] {
        &self.outputs
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn is_static(&self) -> bool {
        self.kind == ComponentKind::Static
    }

    pub fn time_step(&self) -> Option<Time> {
        self.time_step
    }

    pub fn component(&self) -> &Arc<dyn Component> {
        &self.component
    }

    /// Execute the component over `[time, time + dt]`
    ///
    /// The internal state of a time-stepping component is advanced by `dt`.
    /// After a failure the internal state is unspecified.
    pub fn execute(
        &mut self,
        inputs: &InputState,
        time: Time,
        dt: Time,
    ) -> CosimResult<OutputState> {
        for definition in &self.inputs {
            let value = inputs.get(&definition.name)?;
            if value.shape() != definition.shape {
                return Err(CosimError::ShapeMismatch {
                    component: self.name.clone(),
                    variable: definition.name.clone(),
                    expected: definition.shape,
                    got: value.shape(),
                });
            }
        }

        trace!("Executing {} at t={} (dt={})", self.name, time, dt);
        let outputs = self
            .component
            .execute(time, dt, inputs, self.state.as_mut())
            .map_err(|e| CosimError::ComponentExecution {
                component: self.name.clone(),
                time,
                source: Box::new(e),
            })?;

        for definition in &self.outputs {
            let value = outputs.get(&definition.name).ok_or_else(|| {
                CosimError::ComponentExecution {
                    component: self.name.clone(),
                    time,
                    source: Box::new(CosimError::MissingVariable(definition.name.clone())),
                }
            })?;
            if value.shape() != definition.shape {
                return Err(CosimError::ShapeMismatch {
                    component: self.name.clone(),
                    variable: definition.name.clone(),
                    expected: definition.shape,
                    got: value.shape(),
                });
            }
        }

        Ok(outputs)
    }

    /// A copy of the internal state
    pub fn get_state(&self) -> Box<dyn ComponentState> {
        self.state.clone()
    }

    pub fn set_state(&mut self, state: Box<dyn ComponentState>) {
        self.state = state;
    }

    /// Return the internal state to its initial value
    pub fn reset(&mut self) {
        self.state = self.component.create_initial_state();
    }
}
