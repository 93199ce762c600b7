//! Basic system tests: ordering, stepping, inputs, dot, snapshots.

use crate::example_components::{adapt, TestAccumulator, TestClock, TestScale};
use crate::inputs::InputSource;
use crate::solver::CycleSolverKind;
use crate::state::StateValue;
use crate::system::{RunStatus, SystemBuilder, SystemSnapshot, TimeSteppingSystem};
use crate::timeseries::TimeSeries;
use is_close::is_close;
use std::sync::Arc;

/// `C(z -> w)`, `B(y -> z)`, `A(x -> y)` declared in reverse dependency order
fn chain(solver: CycleSolverKind) -> TimeSteppingSystem {
    SystemBuilder::new()
        .with_adapter(adapt(TestScale::new("z", "w", 1.0).with_offset(1.0)).with_name("C"))
        .with_adapter(adapt(TestScale::new("y", "z", 3.0)).with_name("B"))
        .with_adapter(adapt(TestScale::new("x", "y", 2.0)).with_name("A"))
        .with_external_input("x", InputSource::function(|t| StateValue::Scalar(t)))
        .with_final_time(3.0)
        .with_time_step(1.0)
        .with_cycle_solver(solver)
        .build()
        .unwrap()
}

#[test]
fn chain_is_executed_in_dependency_order() {
    let mut system = chain(CycleSolverKind::Jacobi);

    let order: Vec<Vec<usize>> = system
        .execution_order()
        .iter()
        .map(|g| g.members.clone())
        .collect();
    assert_eq!(order, vec![vec![2], vec![1], vec![0]]);
    assert!(system.execution_order().iter().all(|g| !g.is_cyclic()));

    assert_eq!(system.execute().unwrap(), RunStatus::Finished);
    assert_eq!(system.results().times(), &[1.0, 2.0, 3.0]);
    // w = 3 * 2 * x + 1 within a single step
    assert_eq!(
        system.results().scalar("w").unwrap(),
        vec![7.0, 13.0, 19.0]
    );
}

#[test]
fn jacobi_and_gauss_seidel_agree_without_cycles() {
    let mut jacobi = chain(CycleSolverKind::Jacobi);
    let mut gauss_seidel = chain(CycleSolverKind::GaussSeidel);

    jacobi.execute().unwrap();
    gauss_seidel.execute().unwrap();

    assert_eq!(jacobi.results(), gauss_seidel.results());
}

#[test]
fn couplings_point_forward() {
    let system = SystemBuilder::new()
        .with_adapter(adapt(TestScale::new("d", "e", 1.0)))
        .with_adapter(adapt(TestScale::new("a", "b", 1.0)))
        .with_adapter(adapt(TestScale::new("b", "a", 0.5)))
        .with_adapter(adapt(TestScale::new("x", "d", 1.0)))
        .with_adapter(adapt(TestScale::new("e", "f", 1.0)))
        .with_external_input("x", 1.0)
        .build()
        .unwrap();

    let order = system.execution_order();
    for edge in system.coupling_graph().edges() {
        let producer = order.position_of(edge.producer).unwrap();
        let consumer = order.position_of(edge.consumer).unwrap();
        assert!(
            producer < consumer || (producer == consumer && order.groups()[producer].is_cyclic()),
            "{:?}",
            edge
        );
    }
}

#[test]
fn external_inputs_are_evaluated_at_the_end_of_the_step() {
    let mut system = SystemBuilder::new()
        .with_component(Arc::new(TestAccumulator::new("u", "y")))
        .with_external_input("u", InputSource::function(|t| StateValue::Scalar(t)))
        .with_final_time(3.0)
        .with_time_step(1.0)
        .build()
        .unwrap();

    system.execute().unwrap();

    assert_eq!(system.results().scalar("u").unwrap(), vec![1.0, 2.0, 3.0]);
    assert_eq!(system.results().scalar("y").unwrap(), vec![1.0, 3.0, 6.0]);
}

#[test]
fn time_series_inputs_are_step_functions() {
    let series = TimeSeries::from_scalars(vec![0.0, 2.0], vec![1.0, 5.0]).unwrap();
    let mut system = SystemBuilder::new()
        .with_component(Arc::new(TestScale::new("x", "y", 1.0)))
        .with_external_input("x", series)
        .with_final_time(4.0)
        .with_time_step(0.5)
        .build()
        .unwrap();

    system.execute().unwrap();

    assert_eq!(
        system.results().scalar("y").unwrap(),
        vec![1.0, 1.0, 1.0, 5.0, 5.0, 5.0, 5.0, 5.0]
    );
}

#[test]
fn function_inputs_take_priority() {
    let series = TimeSeries::from_scalars(vec![0.0], vec![5.0]).unwrap();
    let mut system = SystemBuilder::new()
        .with_component(Arc::new(TestScale::new("x", "y", 1.0)))
        .with_external_input("x", 2.0)
        .with_external_input("x", series)
        .build()
        .unwrap();

    system.execute().unwrap();
    assert_eq!(system.value("y"), Some(&StateValue::Scalar(5.0)));

    system.set_external_input("x", InputSource::function(|t| StateValue::Scalar(10.0 * t)));
    system.execute().unwrap();
    assert_eq!(system.value("y"), Some(&StateValue::Scalar(10.0)));
}

#[test]
fn last_step_absorbs_the_remainder() {
    let mut system = SystemBuilder::new()
        .with_component(Arc::new(TestClock::new("clock", None)))
        .with_final_time(10.0)
        .with_time_step(4.0)
        .build()
        .unwrap();

    assert_eq!(system.grid().points(), vec![0.0, 4.0, 10.0]);
    system.execute().unwrap();

    assert_eq!(system.results().times(), &[4.0, 10.0]);
    assert_eq!(system.results().scalar("clock_time").unwrap(), vec![4.0, 10.0]);
    assert_eq!(system.current_time(), 10.0);
}

#[test]
fn final_time_is_rounded_to_the_nearest_step() {
    let system = SystemBuilder::new()
        .with_component(Arc::new(TestClock::new("clock", None)))
        .with_final_time(11.0)
        .with_time_step(4.0)
        .build()
        .unwrap();
    assert_eq!(system.grid().points(), vec![0.0, 4.0, 8.0, 11.0]);
}

#[test]
fn duration_strings() {
    let mut system = SystemBuilder::new()
        .with_component(Arc::new(TestClock::new("clock", None)))
        .with_initial_time("1min")
        .with_final_time("1h")
        .with_time_step("15min")
        .build()
        .unwrap();

    assert_eq!(system.current_time(), 60.0);
    system.execute().unwrap();
    assert_eq!(
        system.results().times(),
        &[960.0, 1860.0, 2760.0, 3600.0]
    );
}

#[test]
fn restored_state_is_discarded_by_a_restart() {
    let mut system = SystemBuilder::new()
        .with_component(Arc::new(TestAccumulator::new("u", "y")))
        .with_external_input("u", 1.0)
        .with_final_time(4.0)
        .with_time_step(1.0)
        .with_restart(false)
        .with_do_step(true)
        .build()
        .unwrap();
    system.execute().unwrap();
    system.execute().unwrap();
    let snapshot = system.snapshot();

    system.set_restart(true);
    system.restore(snapshot.clone()).unwrap();
    assert_eq!(system.current_time(), 2.0);
    system.execute().unwrap();
    assert_eq!(system.current_time(), 1.0);
    assert_eq!(system.value("y"), Some(&StateValue::Scalar(1.0)));

    system.set_restart(false);
    system.restore(snapshot).unwrap();
    system.execute().unwrap();
    assert_eq!(system.current_time(), 3.0);
    assert_eq!(system.value("y"), Some(&StateValue::Scalar(3.0)));
}

#[test]
fn dot() {
    let system = SystemBuilder::new()
        .with_adapter(adapt(TestScale::new("x", "y", 1.0)).with_name("A"))
        .with_adapter(adapt(TestAccumulator::new("y", "z")).with_name("B"))
        .with_external_input("x", 1.0)
        .build()
        .unwrap();

    let exp = r#"digraph {
    0 [ label = "A"]
    1 [ label = "B"]
    0 -> 1 [ label = "y"]
}
"#;
    assert_eq!(system.as_dot(), exp);
}

#[test]
fn snapshot_and_restore() {
    let mut system = SystemBuilder::new()
        .with_component(Arc::new(TestAccumulator::new("u", "y")))
        .with_external_input("u", 1.5)
        .with_final_time(4.0)
        .with_time_step(1.0)
        .with_restart(false)
        .with_do_step(true)
        .build()
        .unwrap();

    system.execute().unwrap();
    system.execute().unwrap();
    let snapshot = system.snapshot();

    system.execute().unwrap();
    let after_third = system.value("y").cloned();

    // Resuming from a serialised snapshot replays the same step
    let serialised = serde_json::to_string(&snapshot).unwrap();
    let snapshot: SystemSnapshot = serde_json::from_str(&serialised).unwrap();
    system.restore(snapshot).unwrap();
    assert_eq!(system.current_time(), 2.0);
    assert_eq!(system.results().len(), 2);
    assert_eq!(system.status(), RunStatus::StepComplete);

    system.execute().unwrap();
    assert_eq!(system.value("y").cloned(), after_third);
    assert!(is_close!(
        system.value("y").unwrap().as_scalar().unwrap(),
        4.5
    ));
}
