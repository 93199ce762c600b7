//! Fixed-point resolution of cyclic groups at a single time point.
//!
//! Two schemes are available:
//! - [`CycleSolverKind::Jacobi`] evaluates every member against the previous iterate and
//!   merges the results once the whole group has been evaluated.
//!   Members are independent within an iteration and may be evaluated in parallel.
//! - [`CycleSolverKind::GaussSeidel`] evaluates the members in declaration order,
//!   each one reading the freshest values.
//!
//! The iteration stops once the largest change of the variables exchanged within the group
//! falls below a tolerance or after a maximum number of iterations.
//! With the default of a single iteration, the group is evaluated once per time point and
//! no convergence error is raised.

use crate::adapter::ComponentAdapter;
use crate::errors::{CosimError, CosimResult};
use crate::state::{OutputState, StateValue, VariableStore};
use crate::timeseries::FloatValue;
use log::trace;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CycleSolverKind {
    #[default]
    #[serde(alias = "MDAJacobi")]
    Jacobi,
    #[serde(alias = "MDAGaussSeidel")]
    GaussSeidel,
}

impl FromStr for CycleSolverKind {
    type Err = CosimError;

    fn from_str(s: &str) -> CosimResult<Self> {
        match s {
            "Jacobi" | "MDAJacobi" => Ok(CycleSolverKind::Jacobi),
            "GaussSeidel" | "MDAGaussSeidel" => Ok(CycleSolverKind::GaussSeidel),
            _ => Err(CosimError::InvalidOption(format!(
                "unknown cycle solver '{}', expected 'Jacobi' or 'GaussSeidel'",
                s
            ))),
        }
    }
}

impl fmt::Display for CycleSolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleSolverKind::Jacobi => write!(f, "Jacobi"),
            CycleSolverKind::GaussSeidel => write!(f, "GaussSeidel"),
        }
    }
}

/// How the change between two iterates is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResidualNorm {
    #[default]
    Absolute,
    /// Change relative to the previous iterate
    Relative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CycleSolverOptions {
    pub max_iterations: usize,
    pub tolerance: FloatValue,
    pub residual: ResidualNorm,
    /// Evaluate the members of a Jacobi iteration in parallel
    pub parallel: bool,
}

impl Default for CycleSolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1,
            tolerance: 1e-6,
            residual: ResidualNorm::Absolute,
            parallel: true,
        }
    }
}

/// Outcome of resolving a cyclic group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub iterations: usize,
    pub converged: bool,
    pub residual: FloatValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSolver {
    kind: CycleSolverKind,
    options: CycleSolverOptions,
}

impl CycleSolver {
    pub fn new(kind: CycleSolverKind, options: CycleSolverOptions) -> CosimResult<Self> {
        if options.max_iterations == 0 {
            return Err(CosimError::InvalidOption(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if options.tolerance.is_nan() || options.tolerance < 0.0 {
            return Err(CosimError::InvalidOption(format!(
                "tolerance must be non-negative; got {}",
                options.tolerance
            )));
        }
        Ok(Self { kind, options })
    }

    pub fn kind(&self) -> CycleSolverKind {
        self.kind
    }

    pub fn options(&self) -> &CycleSolverOptions {
        &self.options
    }

    /// Resolve a cyclic group
    ///
    /// `members` are the adapters of the group in declaration order, with their declared
    /// index.
    /// `variables` are the variables exchanged within the group and `store` holds the
    /// current value of every variable, which is used as the initial iterate.
    /// `evaluate` runs a member against a set of values and returns its outputs.
    ///
    /// The internal states of the members are rolled back before each new iteration so
    /// that only the accepted iterate advances them.
    pub fn solve<F>(
        &self,
        members: &mut [(usize, &mut ComponentAdapter)],
        variables: &[String],
        store: &mut VariableStore,
        evaluate: F,
    ) -> CosimResult<CycleReport>
    where
        F: Fn(usize, &mut ComponentAdapter, &VariableStore) -> CosimResult<OutputState>
            + Send
            + Sync,
    {
        let snapshots: Vec<_> = members.iter().map(|(_, a)| a.get_state()).collect();

        let mut iterations = 0;
        let mut residual = FloatValue::INFINITY;
        let mut converged = false;
        while iterations < self.options.max_iterations {
            if iterations > 0 {
                for ((_, adapter), state) in members.iter_mut().zip(&snapshots) {
                    adapter.set_state(state.clone());
                }
            }
            let previous: Vec<Option<StateValue>> =
                variables.iter().map(|v| store.get(v).cloned()).collect();

            match self.kind {
                CycleSolverKind::Jacobi => self.jacobi_pass(members, store, &evaluate)?,
                CycleSolverKind::GaussSeidel => {
                    for (index, adapter) in members.iter_mut() {
                        let outputs = evaluate(*index, &mut **adapter, &*store)?;
                        store.extend(outputs);
                    }
                }
            }
            iterations += 1;

            residual = self.residual(variables, &previous, store);
            converged = residual <= self.options.tolerance;
            trace!(
                "{} iteration {}: residual={:e}",
                self.kind,
                iterations,
                residual
            );
            if converged {
                break;
            }
        }

        if !converged && self.options.max_iterations > 1 {
            return Err(CosimError::UnresolvedCyclicGroup {
                components: members
                    .iter()
                    .map(|(_, a)| a.name().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                iterations,
                residual,
                tolerance: self.options.tolerance,
            });
        }

        Ok(CycleReport {
            iterations,
            converged,
            residual,
        })
    }

    fn jacobi_pass<F>(
        &self,
        members: &mut [(usize, &mut ComponentAdapter)],
        store: &mut VariableStore,
        evaluate: &F,
    ) -> CosimResult<()>
    where
        F: Fn(usize, &mut ComponentAdapter, &VariableStore) -> CosimResult<OutputState>
            + Send
            + Sync,
    {
        let reads: &VariableStore = store;
        let results: Vec<OutputState> = if self.options.parallel && members.len() > 1 {
            members
                .par_iter_mut()
                .map(|(index, adapter)| evaluate(*index, &mut **adapter, reads))
                .collect::<CosimResult<_>>()?
        } else {
            members
                .iter_mut()
                .map(|(index, adapter)| evaluate(*index, &mut **adapter, reads))
                .collect::<CosimResult<_>>()?
        };
        for outputs in results {
            store.extend(outputs);
        }
        Ok(())
    }

    fn residual(
        &self,
        variables: &[String],
        previous: &[Option<StateValue>],
        store: &VariableStore,
    ) -> FloatValue {
        variables
            .iter()
            .zip(previous)
            .map(|(name, old)| match (store.get(name), old) {
                (Some(new), Some(old)) => match self.options.residual {
                    ResidualNorm::Absolute => new.max_abs_diff(old),
                    ResidualNorm::Relative => new.max_rel_diff(old),
                }
                .unwrap_or(FloatValue::INFINITY),
                _ => FloatValue::INFINITY,
            })
            .fold(0.0, FloatValue::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::example_components::{adapt, TestAccumulator, TestScale, TestSum};
    use crate::state::InputState;
    use indexmap::IndexMap;
    use is_close::is_close;

    fn run(adapter: &mut ComponentAdapter, store: &VariableStore) -> CosimResult<OutputState> {
        let values: IndexMap<String, StateValue> = adapter
            .inputs()
            .iter()
            .map(|d| (d.name.clone(), store[&d.name].clone()))
            .collect();
        adapter.execute(&InputState::build(values, 0.0), 0.0, 1.0)
    }

    /// y = 0.5 x + 1 and x = 0.5 y, whose fixed point is y = 4/3, x = 2/3
    fn affine_pair() -> Vec<ComponentAdapter> {
        vec![
            adapt(TestScale::new("x", "y", 0.5).with_offset(1.0)),
            adapt(TestScale::new("y", "x", 0.5)),
        ]
    }

    fn zero_store() -> VariableStore {
        let mut store = VariableStore::new();
        store.insert("x".to_string(), StateValue::Scalar(0.0));
        store.insert("y".to_string(), StateValue::Scalar(0.0));
        store
    }

    fn solve(
        solver: &CycleSolver,
        adapters: &mut [ComponentAdapter],
        store: &mut VariableStore,
    ) -> CosimResult<CycleReport> {
        let mut members: Vec<(usize, &mut ComponentAdapter)> =
            adapters.iter_mut().enumerate().collect();
        let variables = vec!["x".to_string(), "y".to_string()];
        solver.solve(&mut members, &variables, store, |_, a, s| run(a, s))
    }

    #[test]
    fn parse_kind() {
        assert_eq!("MDAJacobi".parse::<CycleSolverKind>().unwrap(), CycleSolverKind::Jacobi);
        assert_eq!(
            "GaussSeidel".parse::<CycleSolverKind>().unwrap(),
            CycleSolverKind::GaussSeidel
        );
        assert!("Newton".parse::<CycleSolverKind>().is_err());
        assert_eq!(CycleSolverKind::default(), CycleSolverKind::Jacobi);
    }

    #[test]
    fn invalid_options() {
        let options = CycleSolverOptions {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(CycleSolver::new(CycleSolverKind::Jacobi, options).is_err());
    }

    #[test]
    fn single_jacobi_pass_reads_previous_iterate() {
        let solver = CycleSolver::new(CycleSolverKind::Jacobi, Default::default()).unwrap();
        let mut adapters = affine_pair();
        let mut store = zero_store();

        let report = solve(&solver, &mut adapters, &mut store).unwrap();

        assert_eq!(report.iterations, 1);
        assert!(!report.converged);
        assert_eq!(store["y"], StateValue::Scalar(1.0));
        assert_eq!(store["x"], StateValue::Scalar(0.0));
    }

    #[test]
    fn single_gauss_seidel_pass_reads_fresh_values() {
        let solver = CycleSolver::new(CycleSolverKind::GaussSeidel, Default::default()).unwrap();
        let mut adapters = affine_pair();
        let mut store = zero_store();

        solve(&solver, &mut adapters, &mut store).unwrap();

        assert_eq!(store["y"], StateValue::Scalar(1.0));
        assert_eq!(store["x"], StateValue::Scalar(0.5));
    }

    #[test]
    fn converges_to_fixed_point() {
        for kind in [CycleSolverKind::Jacobi, CycleSolverKind::GaussSeidel] {
            let options = CycleSolverOptions {
                max_iterations: 100,
                tolerance: 1e-12,
                ..Default::default()
            };
            let solver = CycleSolver::new(kind, options).unwrap();
            let mut adapters = affine_pair();
            let mut store = zero_store();

            let report = solve(&solver, &mut adapters, &mut store).unwrap();

            assert!(report.converged);
            assert!(report.iterations > 1);
            assert!(is_close!(store["y"].as_scalar().unwrap(), 4.0 / 3.0));
            assert!(is_close!(store["x"].as_scalar().unwrap(), 2.0 / 3.0));
        }
    }

    #[test]
    fn gauss_seidel_needs_fewer_iterations() {
        let options = CycleSolverOptions {
            max_iterations: 100,
            tolerance: 1e-10,
            ..Default::default()
        };
        let mut counts = vec![];
        for kind in [CycleSolverKind::Jacobi, CycleSolverKind::GaussSeidel] {
            let solver = CycleSolver::new(kind, options.clone()).unwrap();
            let mut adapters = affine_pair();
            let mut store = zero_store();
            counts.push(solve(&solver, &mut adapters, &mut store).unwrap().iterations);
        }
        assert!(counts[1] < counts[0]);
    }

    #[test]
    fn iteration_bound_exceeded() {
        let options = CycleSolverOptions {
            max_iterations: 3,
            tolerance: 1e-12,
            ..Default::default()
        };
        let solver = CycleSolver::new(CycleSolverKind::Jacobi, options).unwrap();
        let mut adapters = affine_pair();
        let mut store = zero_store();

        let err = solve(&solver, &mut adapters, &mut store).unwrap_err();
        assert!(matches!(
            err,
            CosimError::UnresolvedCyclicGroup { iterations: 3, .. }
        ));
        assert!(err.to_string().contains("[TestScale, TestScale]"));
    }

    #[test]
    fn relative_residual() {
        let options = CycleSolverOptions {
            max_iterations: 200,
            tolerance: 1e-9,
            residual: ResidualNorm::Relative,
            parallel: false,
        };
        let solver = CycleSolver::new(CycleSolverKind::Jacobi, options).unwrap();
        let mut adapters = affine_pair();
        let mut store = zero_store();

        let report = solve(&solver, &mut adapters, &mut store).unwrap();
        assert!(report.converged);
        assert!(is_close!(store["y"].as_scalar().unwrap(), 4.0 / 3.0, rel_tol = 1e-6));
    }

    #[test]
    fn states_are_rolled_back_between_iterations() {
        // z accumulates y over the step, y = 0.5 z + 1
        let options = CycleSolverOptions {
            max_iterations: 100,
            tolerance: 1e-12,
            ..Default::default()
        };
        let solver = CycleSolver::new(CycleSolverKind::GaussSeidel, options).unwrap();
        let mut adapters = vec![
            adapt(TestScale::new("z", "y", 0.5).with_offset(1.0)),
            adapt(TestAccumulator::new("y", "z")),
        ];
        let mut store = VariableStore::new();
        store.insert("y".to_string(), StateValue::Scalar(0.0));
        store.insert("z".to_string(), StateValue::Scalar(0.0));

        let mut members: Vec<(usize, &mut ComponentAdapter)> =
            adapters.iter_mut().enumerate().collect();
        let variables = vec!["y".to_string(), "z".to_string()];
        let report = solver
            .solve(&mut members, &variables, &mut store, |_, a, s| run(a, s))
            .unwrap();
        assert!(report.iterations > 2);

        // With dt = 1 and a single accepted advance, z = y and y = 0.5 y + 1
        assert!(is_close!(store["y"].as_scalar().unwrap(), 2.0));
        assert!(is_close!(store["z"].as_scalar().unwrap(), 2.0));
    }

    #[test]
    fn parallel_jacobi_matches_serial_evaluation() {
        // y = 0.5 z + 1, w = 0.25 y, v = y + w and z accumulates v
        let group = || {
            vec![
                adapt(TestScale::new("z", "y", 0.5).with_offset(1.0)),
                adapt(TestSum::new(&["y", "w"], "v")),
                adapt(TestAccumulator::new("v", "z")),
                adapt(TestScale::new("y", "w", 0.25)),
            ]
        };
        let variables: Vec<String> = ["y", "v", "z", "w"].iter().map(|s| s.to_string()).collect();

        let mut outcomes = vec![];
        for parallel in [true, false] {
            let options = CycleSolverOptions {
                max_iterations: 500,
                tolerance: 1e-12,
                parallel,
                ..Default::default()
            };
            let solver = CycleSolver::new(CycleSolverKind::Jacobi, options).unwrap();
            let mut adapters = group();
            let mut store: VariableStore = variables
                .iter()
                .map(|name| (name.clone(), StateValue::Scalar(0.0)))
                .collect();

            let mut members: Vec<(usize, &mut ComponentAdapter)> =
                adapters.iter_mut().enumerate().collect();
            let report = solver
                .solve(&mut members, &variables, &mut store, |_, a, s| run(a, s))
                .unwrap();
            let state = serde_json::to_string(&adapters[2].get_state()).unwrap();
            outcomes.push((report, store, state));
        }

        let (parallel, serial) = (&outcomes[0], &outcomes[1]);
        assert!(parallel.0.converged);
        assert_eq!(parallel.0, serial.0);
        assert_eq!(parallel.1, serial.1);
        assert_eq!(parallel.2, serial.2);
        // z = v = 1.25 y with dt = 1, so y = 0.625 y + 1
        assert!(is_close!(parallel.1["y"].as_scalar().unwrap(), 8.0 / 3.0));
    }
}
