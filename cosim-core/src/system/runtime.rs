//! System struct and runtime execution.

use crate::adapter::ComponentAdapter;
use crate::errors::{CosimError, CosimResult};
use crate::graph::CouplingGraph;
use crate::inputs::{ExternalInputs, InputSource};
use crate::partition::ExecutionOrder;
use crate::solver::CycleSolver;
use crate::state::{OutputState, StateValue, VariableStore};
use crate::time_grid::TimeGrid;
use crate::timeseries::Time;
use indexmap::IndexMap;
use is_close::is_close;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::options::SystemOptions;
use super::state_extraction::extract_state;
use super::types::{ExecutionState, RunStatus, SimulationResults, SystemSnapshot};

/// A coupled set of components that are advanced together over a time grid.
///
/// Components exchange values through variables with matching names.
/// At every time step the components are executed group by group following the
/// [`ExecutionOrder`].
/// Groups of mutually dependent components are resolved by the [`CycleSolver`] before the
/// next group is executed.
///
/// Inputs which no component produces are fed from external sources evaluated at the end
/// of each step.
/// The values at the end of every step are recorded in the [`SimulationResults`].
#[derive(Debug)]
pub struct TimeSteppingSystem {
    /// The components in declaration order, each owning its internal state
    adapters: Vec<ComponentAdapter>,
    graph: CouplingGraph,
    order: ExecutionOrder,
    /// Variables exchanged inside each group of `order`
    ///
    /// Empty for sequential groups.
    group_variables: Vec<Vec<String>>,
    grid: TimeGrid,
    solver: CycleSolver,
    external_inputs: ExternalInputs,
    initial_values: IndexMap<String, StateValue>,
    restart: bool,
    do_step: bool,
    apply_time_step: bool,
    cancel: Option<Arc<AtomicBool>>,
    status: RunStatus,
    state: ExecutionState,
    results: SimulationResults,
}

impl TimeSteppingSystem {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        adapters: Vec<ComponentAdapter>,
        graph: CouplingGraph,
        order: ExecutionOrder,
        grid: TimeGrid,
        solver: CycleSolver,
        external_inputs: ExternalInputs,
        initial_values: IndexMap<String, StateValue>,
        options: &SystemOptions,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Self {
        let group_variables = order
            .iter()
            .map(|group| {
                if group.is_cyclic() {
                    graph.internal_variables(&group.members)
                } else {
                    vec![]
                }
            })
            .collect();
        let n_components = adapters.len();
        let initial_time = grid.initial_time();

        let mut system = Self {
            adapters,
            graph,
            order,
            group_variables,
            grid,
            solver,
            external_inputs,
            initial_values,
            restart: options.restart,
            do_step: options.do_step,
            apply_time_step: options.apply_time_step_to_components,
            cancel,
            status: RunStatus::Idle,
            state: ExecutionState {
                current_time: initial_time,
                step_index: 0,
                iterations: 0,
                converged: true,
                values: VariableStore::new(),
                component_times: vec![initial_time; n_components],
            },
            results: SimulationResults::default(),
        };
        system.state.values = system.initial_store();
        system
    }

    /// Value of every produced variable before the first step
    ///
    /// Uses the initial value given to the builder, then the default declared by the
    /// producer, then zeros.
    fn initial_store(&self) -> VariableStore {
        self.graph
            .outputs()
            .map(|(name, shape)| {
                let value = self.initial_values.get(name).cloned().or_else(|| {
                    let producer = self.graph.producer_of(name)?;
                    self.adapters[producer]
                        .outputs()
                        .iter()
                        .find(|d| &d.name == name)
                        .and_then(|d| d.default.clone())
                });
                (name.clone(), value.unwrap_or_else(|| StateValue::zeros(shape)))
            })
            .collect()
    }

    /// Return the components and the execution state to the initial time
    ///
    /// Recorded results are discarded.
    pub fn reset(&mut self) {
        for adapter in self.adapters.iter_mut() {
            adapter.reset();
        }
        let initial_time = self.grid.initial_time();
        self.state = ExecutionState {
            current_time: initial_time,
            step_index: 0,
            iterations: 0,
            converged: true,
            values: self.initial_store(),
            component_times: vec![initial_time; self.adapters.len()],
        };
        self.results.clear();
        self.status = RunStatus::Idle;
    }

    /// Execute the system
    ///
    /// With `restart` the system first returns to the initial time.
    /// With `do_step` a single time step is executed, otherwise the system is executed up to
    /// the final time.
    ///
    /// Returns the status reached, either [`RunStatus::StepComplete`] or
    /// [`RunStatus::Finished`].
    /// If a step fails the system is marked as [`RunStatus::Failed`] and must be restarted.
    pub fn execute(&mut self) -> CosimResult<RunStatus> {
        if self.restart {
            self.reset();
        } else if self.status == RunStatus::Failed {
            return Err(CosimError::RestartRequired);
        }
        if self.finished() {
            return Err(CosimError::Finished(self.state.current_time));
        }

        let target = if self.do_step {
            self.grid
                .point(self.state.step_index + 1)
                .unwrap_or(self.grid.final_time())
        } else {
            self.grid.final_time()
        };
        info!("Executing from t={} to t={}", self.state.current_time, target);
        self.status = RunStatus::Running;
        loop {
            if self.take_cancellation() {
                self.status = match self.state.step_index {
                    0 => RunStatus::Idle,
                    _ => RunStatus::StepComplete,
                };
                return Err(CosimError::Cancelled(self.state.current_time));
            }
            if let Err(e) = self.advance() {
                self.status = RunStatus::Failed;
                return Err(e);
            }
            if self.finished() {
                info!("Reached the final time t={}", self.state.current_time);
                self.status = RunStatus::Finished;
                return Ok(self.status);
            }
            if self.do_step {
                self.status = RunStatus::StepComplete;
                return Ok(self.status);
            }
        }
    }

    /// Advance every component from the current time point to the next one
    fn advance(&mut self) -> CosimResult<()> {
        let k = self.state.step_index;
        let (t0, t1) = match (self.grid.point(k), self.grid.point(k + 1)) {
            (Some(t0), Some(t1)) => (t0, t1),
            _ => return Err(CosimError::Finished(self.state.current_time)),
        };
        debug!("Step {} of {}: t={} -> t={}", k + 1, self.grid.n_steps(), t0, t1);

        let mut store = self.state.values.clone();
        for (name, shape) in self.graph.external_inputs() {
            if let Some(value) = self.external_inputs.evaluate(name, t1)? {
                if value.shape() != *shape {
                    return Err(CosimError::ShapeMismatch {
                        component: self.consumer_of(name).to_string(),
                        variable: name.clone(),
                        expected: *shape,
                        got: value.shape(),
                    });
                }
                store.insert(name.clone(), value);
            }
        }

        let mut clocks = self.state.component_times.clone();
        let schedules: Vec<Vec<(Time, Time)>> = self
            .adapters
            .iter()
            .zip(clocks.iter_mut())
            .map(|(adapter, clock)| schedule(adapter, clock, t0, t1, self.apply_time_step))
            .collect();

        let mut iterations = 0;
        let mut converged = true;
        for (position, (group, variables)) in
            self.order.iter().zip(&self.group_variables).enumerate()
        {
            if position > 0 && take_flag(&self.cancel) {
                return Err(CosimError::Cancelled(t0));
            }

            if group.is_cyclic() {
                let mut members: Vec<(usize, &mut ComponentAdapter)> = self
                    .adapters
                    .iter_mut()
                    .enumerate()
                    .filter(|(index, _)| group.members.contains(index))
                    .collect();
                let report = self.solver.solve(
                    &mut members,
                    variables,
                    &mut store,
                    |index, adapter, values| run_schedule(adapter, values, &schedules[index]),
                )?;
                iterations = iterations.max(report.iterations);
                converged &= report.converged;
            } else {
                let index = group.members[0];
                let outputs = run_schedule(&mut self.adapters[index], &store, &schedules[index])?;
                store.extend(outputs);
            }
        }

        self.state.values = store;
        self.state.current_time = t1;
        self.state.step_index = k + 1;
        self.state.iterations = iterations;
        self.state.converged = converged;
        self.state.component_times = clocks;
        self.results.record(t1, &self.state.values);
        Ok(())
    }

    fn consumer_of(&self, variable: &str) -> &str {
        self.adapters
            .iter()
            .find(|a| a.inputs().iter().any(|d| d.name == variable))
            .map(|a| a.name())
            .unwrap_or("?")
    }

    fn take_cancellation(&self) -> bool {
        take_flag(&self.cancel)
    }

    /// Whether the final time has been reached
    pub fn finished(&self) -> bool {
        self.state.step_index >= self.grid.n_steps()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn current_time(&self) -> Time {
        self.state.current_time
    }

    pub fn execution_state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn results(&self) -> &SimulationResults {
        &self.results
    }

    /// Latest value of a variable
    pub fn value(&self, name: &str) -> Option<&StateValue> {
        self.state.values.get(name)
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn execution_order(&self) -> &ExecutionOrder {
        &self.order
    }

    pub fn coupling_graph(&self) -> &CouplingGraph {
        &self.graph
    }

    pub fn components(&self) -> &[ComponentAdapter] {
        &self.adapters
    }

    pub fn cycle_solver(&self) -> &CycleSolver {
        &self.solver
    }

    /// Returns a string which contains the graph of couplings in the dot format.
    ///
    /// This can be visualised using graphviz.
    pub fn as_dot(&self) -> String {
        self.graph.as_dot()
    }

    pub fn set_restart(&mut self, restart: bool) {
        self.restart = restart;
    }

    pub fn set_do_step(&mut self, do_step: bool) {
        self.do_step = do_step;
    }

    /// Register a source for an external input
    ///
    /// The new source is used from the next step on.
    pub fn set_external_input(&mut self, name: &str, source: impl Into<InputSource>) {
        if !self.graph.external_inputs().contains_key(name) {
            warn!("Ignoring external input '{}' which no component consumes", name);
            return;
        }
        self.external_inputs.set(name, source);
    }

    /// Flag used to cancel an execution from another thread
    ///
    /// The flag is honoured between groups and between time steps, and is cleared once
    /// the cancellation has been observed.
    pub fn cancellation(&mut self) -> Arc<AtomicBool> {
        self.cancel
            .get_or_insert_with(|| Arc::new(AtomicBool::new(false)))
            .clone()
    }

    /// A copy of the execution state and of the internal state of every component
    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot {
            status: self.status,
            state: self.state.clone(),
            component_states: self.adapters.iter().map(|a| a.get_state()).collect(),
            results: self.results.clone(),
        }
    }

    /// Resume from a snapshot taken on a system with the same components
    ///
    /// The next [`execute`](Self::execute) only continues from the snapshot when `restart`
    /// is disabled. Otherwise it resets the system and the restored state is discarded.
    pub fn restore(&mut self, snapshot: SystemSnapshot) -> CosimResult<()> {
        if snapshot.component_states.len() != self.adapters.len()
            || snapshot.state.component_times.len() != self.adapters.len()
        {
            return Err(CosimError::Error(format!(
                "The snapshot holds {} components; the system has {}",
                snapshot.component_states.len(),
                self.adapters.len()
            )));
        }
        for (adapter, state) in self.adapters.iter_mut().zip(snapshot.component_states) {
            adapter.set_state(state);
        }
        self.status = snapshot.status;
        self.state = snapshot.state;
        self.results = snapshot.results;
        if self.restart {
            warn!(
                "Restored a snapshot at t={} into a system which restarts on every execution",
                self.state.current_time
            );
        }
        Ok(())
    }
}

fn take_flag(flag: &Option<Arc<AtomicBool>>) -> bool {
    flag.as_ref()
        .map(|f| f.swap(false, Ordering::SeqCst))
        .unwrap_or(false)
}

/// Sub-steps executed by a component during the system step `[t0, t1]`
///
/// Each sub-step is given by its start time and length.
/// `clock` is the time reached by the component and is moved to the end of the last
/// sub-step.
fn schedule(
    adapter: &ComponentAdapter,
    clock: &mut Time,
    t0: Time,
    t1: Time,
    apply_time_step: bool,
) -> Vec<(Time, Time)> {
    let h = match adapter.time_step() {
        Some(h) if !apply_time_step && !adapter.is_static() => h,
        _ => {
            *clock = t1;
            return vec![(t0, t1 - t0)];
        }
    };

    let mut steps = vec![];
    let mut tau = *clock;
    while tau + h < t1 || is_close!(tau + h, t1) {
        steps.push((tau, h));
        tau += h;
    }
    *clock = tau;
    steps
}

/// Execute the sub-steps of a component with inputs read from `values`
///
/// The inputs are held over the sub-steps.
/// A component without any sub-step keeps its previous outputs.
fn run_schedule(
    adapter: &mut ComponentAdapter,
    values: &VariableStore,
    schedule: &[(Time, Time)],
) -> CosimResult<OutputState> {
    let Some((start, _)) = schedule.first() else {
        return adapter
            .outputs()
            .iter()
            .map(|d| {
                values
                    .get(&d.name)
                    .map(|v| (d.name.clone(), v.clone()))
                    .ok_or_else(|| CosimError::MissingVariable(d.name.clone()))
            })
            .collect();
    };

    let inputs = extract_state(adapter, values, *start)?;
    let mut outputs = OutputState::new();
    for (time, dt) in schedule {
        outputs = adapter.execute(&inputs, *time, *dt)?;
    }
    Ok(outputs)
}
