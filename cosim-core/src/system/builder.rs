//! System builder for constructing time-stepping systems from components.

use crate::adapter::{ComponentAdapter, ComponentLoader, ComponentSource};
use crate::component::Component;
use crate::duration::DurationValue;
use crate::errors::{CosimError, CosimResult};
use crate::graph::CouplingGraph;
use crate::inputs::{ExternalInputs, InputSource};
use crate::partition::ExecutionOrder;
use crate::solver::{CycleSolverKind, CycleSolverOptions};
use crate::state::StateValue;
use indexmap::IndexMap;
use log::{info, warn};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::options::SystemOptions;
use super::runtime::TimeSteppingSystem;

enum ComponentEntry {
    Source(ComponentSource),
    Adapter(ComponentAdapter),
}

/// Build a new system from a set of components.
///
/// The builder discovers the couplings between the components, determines their execution
/// order and checks that every input which is not produced by a component can be fed.
pub struct SystemBuilder {
    components: Vec<ComponentEntry>,
    loader: Option<Arc<dyn ComponentLoader>>,
    external_inputs: ExternalInputs,
    initial_values: IndexMap<String, StateValue>,
    options: SystemOptions,
    cancel: Option<Arc<AtomicBool>>,
}

impl Default for SystemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemBuilder {
    /// Create a new system builder with default settings.
    pub fn new() -> Self {
        Self {
            components: vec![],
            loader: None,
            external_inputs: ExternalInputs::new(),
            initial_values: IndexMap::new(),
            options: SystemOptions::default(),
            cancel: None,
        }
    }

    /// Register a component with the builder.
    pub fn with_component(&mut self, component: Arc<dyn Component>) -> &mut Self {
        self.components
            .push(ComponentEntry::Source(ComponentSource::InMemory(component)));
        self
    }

    /// Register a component from any source.
    ///
    /// Sources are resolved when the system is built.
    pub fn with_source(&mut self, source: ComponentSource) -> &mut Self {
        self.components.push(ComponentEntry::Source(source));
        self
    }

    /// Register an adapter, e.g. one with a custom name or time step.
    pub fn with_adapter(&mut self, adapter: ComponentAdapter) -> &mut Self {
        self.components.push(ComponentEntry::Adapter(adapter));
        self
    }

    /// Set the loader used to resolve file sources.
    pub fn with_loader(&mut self, loader: Arc<dyn ComponentLoader>) -> &mut Self {
        self.loader = Some(loader);
        self
    }

    /// Supply a value for an input that is not produced by any component.
    ///
    /// A function, a time series and a constant may all be supplied for the same input.
    /// They are used in that order of priority.
    pub fn with_external_input(
        &mut self,
        name: &str,
        source: impl Into<InputSource>,
    ) -> &mut Self {
        self.external_inputs.set(name, source);
        self
    }

    /// Values of coupling variables before the first step.
    ///
    /// Variables without an initial value start at the default declared by their producer,
    /// or zero.
    pub fn with_initial_values(
        &mut self,
        initial_values: IndexMap<String, StateValue>,
    ) -> &mut Self {
        self.initial_values.extend(initial_values);
        self
    }

    pub fn with_initial_value(&mut self, name: &str, value: impl Into<StateValue>) -> &mut Self {
        self.initial_values.insert(name.to_string(), value.into());
        self
    }

    /// Replace all of the options.
    pub fn with_options(&mut self, options: SystemOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Times are seconds or duration strings such as `"1h 30m"`.
    ///
    /// Strings are parsed by [`SystemBuilder::build`].
    pub fn with_initial_time(&mut self, time: impl Into<DurationValue>) -> &mut Self {
        self.options.initial_time = time.into();
        self
    }

    pub fn with_final_time(&mut self, time: impl Into<DurationValue>) -> &mut Self {
        self.options.final_time = time.into();
        self
    }

    pub fn with_time_step(&mut self, time_step: impl Into<DurationValue>) -> &mut Self {
        self.options.time_step = time_step.into();
        self
    }

    pub fn with_restart(&mut self, restart: bool) -> &mut Self {
        self.options.restart = restart;
        self
    }

    pub fn with_do_step(&mut self, do_step: bool) -> &mut Self {
        self.options.do_step = do_step;
        self
    }

    pub fn with_apply_time_step_to_components(&mut self, apply: bool) -> &mut Self {
        self.options.apply_time_step_to_components = apply;
        self
    }

    pub fn with_cycle_solver(&mut self, kind: CycleSolverKind) -> &mut Self {
        self.options.algo_name = kind;
        self
    }

    pub fn with_cycle_solver_options(&mut self, options: CycleSolverOptions) -> &mut Self {
        self.options.mda_options = options;
        self
    }

    /// Flag checked between groups and between time steps to stop an execution.
    pub fn with_cancellation(&mut self, flag: Arc<AtomicBool>) -> &mut Self {
        self.cancel = Some(flag);
        self
    }

    /// Builds the coupling graph of the registered components and creates a concrete system.
    ///
    /// Returns an error if the options are invalid, if a source cannot be resolved or if
    /// the component definitions are inconsistent.
    pub fn build(&self) -> CosimResult<TimeSteppingSystem> {
        let grid = self.options.time_grid()?;
        let solver = self.options.cycle_solver()?;

        let mut adapters = Vec::with_capacity(self.components.len());
        for entry in &self.components {
            let adapter = match entry {
                ComponentEntry::Source(source) => {
                    ComponentAdapter::new(source.resolve(self.loader.as_deref())?)
                }
                ComponentEntry::Adapter(adapter) => adapter.clone(),
            };
            if let Some(h) = adapter.time_step() {
                if !(h.is_finite() && h > 0.0) {
                    return Err(CosimError::InvalidOption(format!(
                        "the time step of '{}' must be positive; got {}",
                        adapter.name(),
                        h
                    )));
                }
            }
            adapters.push(adapter);
        }

        let graph = CouplingGraph::build(&adapters)?;
        let order = ExecutionOrder::from_graph(&graph);

        for adapter in &adapters {
            for input in adapter.inputs() {
                if graph.is_coupled(&input.name) {
                    continue;
                }
                match self.external_inputs.get(&input.name) {
                    None if input.default.is_none() => {
                        return Err(CosimError::MissingExternalInput {
                            component: adapter.name().to_string(),
                            variable: input.name.clone(),
                        })
                    }
                    Some(external) => match external.static_shape() {
                        Some(shape) if shape != input.shape => {
                            return Err(CosimError::ShapeMismatch {
                                component: adapter.name().to_string(),
                                variable: input.name.clone(),
                                expected: input.shape,
                                got: shape,
                            })
                        }
                        _ => {}
                    },
                    None => {}
                }
            }
        }
        for name in self.external_inputs.names() {
            if !graph.external_inputs().contains_key(name) {
                warn!("Ignoring external input '{}' which no component consumes", name);
            }
        }

        let mut initial_values = IndexMap::new();
        for (name, value) in &self.initial_values {
            match graph.producer_of(name) {
                None => warn!(
                    "Ignoring initial value of '{}' which is not produced by any component",
                    name
                ),
                Some(producer) => {
                    let expected = adapters[producer]
                        .outputs()
                        .iter()
                        .find(|d| &d.name == name)
                        .map(|d| d.shape);
                    if expected != Some(value.shape()) {
                        return Err(CosimError::ShapeMismatch {
                            component: adapters[producer].name().to_string(),
                            variable: name.clone(),
                            expected: expected.unwrap_or(value.shape()),
                            got: value.shape(),
                        });
                    }
                    initial_values.insert(name.clone(), value.clone());
                }
            }
        }

        info!(
            "Built a system of {} components in {} groups ({} cyclic) with {} steps",
            adapters.len(),
            order.len(),
            order.iter().filter(|g| g.is_cyclic()).count(),
            grid.n_steps()
        );

        Ok(TimeSteppingSystem::new(
            adapters,
            graph,
            order,
            grid,
            solver,
            self.external_inputs.clone(),
            initial_values,
            &self.options,
            self.cancel.clone(),
        ))
    }
}
