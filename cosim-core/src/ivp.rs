//! Helpers for time-stepping components described by an initial value problem.
//!
//! A component implements [`IVP`] to provide the derivatives of its state.
//! [`IVPBuilder`] adapts it to an `ode_solvers` system, holding the inputs constant over
//! the integration interval.

use crate::errors::{CosimError, CosimResult};
use crate::state::InputState;
use crate::timeseries::{FloatValue, Time};
use is_close::is_close;
use ode_solvers::dop_shared::OutputType;
use ode_solvers::{Dopri5, SVector, System};

/// Fixed-size state vector used by the ODE solvers
pub type OdeState<const N: usize> = SVector<FloatValue, N>;

const DEFAULT_RTOL: FloatValue = 1e-10;
const DEFAULT_ATOL: FloatValue = 1e-10;
const MAX_STEPS: u32 = 100_000;

pub trait IVP<T, S> {
    /// Calculate the derivatives `dy_dt` of the state `y` at time `t`
    fn calculate_dy_dt(&self, t: T, input_state: &InputState, y: &S, dy_dt: &mut S);
}

/// Couples a component with its inputs and an initial state
pub struct IVPBuilder<'a, C, S> {
    component: &'a C,
    input_state: &'a InputState,
    y0: S,
}

impl<'a, C, const N: usize> System<Time, OdeState<N>> for IVPBuilder<'a, C, OdeState<N>>
where
    C: IVP<Time, OdeState<N>>,
{
    fn system(&self, t: Time, y: &OdeState<N>, dy: &mut OdeState<N>) {
        self.component.calculate_dy_dt(t, self.input_state, y, dy);
    }
}

impl<'a, C, const N: usize> IVPBuilder<'a, C, OdeState<N>>
where
    C: IVP<Time, OdeState<N>>,
{
    pub fn new(component: &'a C, input_state: &'a InputState, y0: OdeState<N>) -> Self {
        Self {
            component,
            input_state,
            y0,
        }
    }

    /// Create an adaptive Dormand-Prince solver over `[t0, t1]`
    ///
    /// The solver records every accepted step, ending at `t1`.
    pub fn to_dopri5(
        self,
        t0: Time,
        t1: Time,
        rtol: FloatValue,
        atol: FloatValue,
    ) -> Dopri5<Time, OdeState<N>, Self> {
        let y0 = self.y0;
        Dopri5::from_param(
            self,
            t0,
            t1,
            t1 - t0,
            y0,
            rtol,
            atol,
            0.9,
            0.04,
            0.2,
            10.0,
            t1 - t0,
            0.0,
            MAX_STEPS,
            1000,
            OutputType::Sparse,
        )
    }

    /// Integrate from `t0` to `t1` and return the state at `t1`
    ///
    /// An empty interval returns the initial state unchanged.
    pub fn integrate(self, t0: Time, t1: Time) -> CosimResult<OdeState<N>> {
        if t1 <= t0 {
            return Ok(self.y0);
        }
        let mut solver = self.to_dopri5(t0, t1, DEFAULT_RTOL, DEFAULT_ATOL);
        solver
            .integrate()
            .map_err(|e| CosimError::Error(format!("ODE integration failed: {:?}", e)))?;

        get_last_step(solver.x_out(), solver.y_out(), t1)
    }
}

/// The state at the end of the integration
///
/// Fails if the solver stopped before reaching `t_expected`.
pub fn get_last_step<S: Clone>(times: &[Time], states: &[S], t_expected: Time) -> CosimResult<S> {
    match (times.last(), states.last()) {
        (Some(t), Some(y)) if is_close!(*t, t_expected) => Ok(y.clone()),
        (Some(t), _) => Err(CosimError::Error(format!(
            "ODE integration stopped at t={} before reaching t={}",
            t, t_expected
        ))),
        _ => Err(CosimError::Error(
            "ODE integration produced no results".to_string(),
        )),
    }
}
