use crate::state::Shape;
use crate::timeseries::Time;
use thiserror::Error;

/// Error type for invalid operations.
#[derive(Error, Debug)]
pub enum CosimError {
    #[error("{0}")]
    Error(String),
    #[error("Output '{variable}' is produced by both '{first}' and '{second}'. Output names must be unique across all components.")]
    DuplicateOutput {
        variable: String,
        first: String,
        second: String,
    },
    #[error("Cyclic group [{components}] did not converge after {iterations} iterations (residual={residual:e}, tolerance={tolerance:e})")]
    UnresolvedCyclicGroup {
        components: String,
        iterations: usize,
        residual: f64,
        tolerance: f64,
    },
    #[error("Shape mismatch for variable '{variable}' of component '{component}': expected {expected}, got {got}")]
    ShapeMismatch {
        component: String,
        variable: String,
        expected: Shape,
        got: Shape,
    },
    #[error("Component '{component}' failed at t={time}: {source}")]
    ComponentExecution {
        component: String,
        time: Time,
        #[source]
        source: Box<CosimError>,
    },
    #[error("Invalid time grid: {0}")]
    InvalidTimeGrid(String),
    #[error("Invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },
    #[error("Invalid time series: {0}")]
    InvalidTimeSeries(String),
    #[error("The time series starts at {start}; got {time}.")]
    TimeSeriesOutOfRange { start: Time, time: Time },
    #[error("Input '{variable}' of component '{component}' is not produced by any component and has no external source or default value")]
    MissingExternalInput { component: String, variable: String },
    #[error("Variable '{0}' is not available")]
    MissingVariable(String),
    #[error("Invalid internal state for component '{0}'")]
    InvalidState(String),
    #[error("Invalid option: {0}")]
    InvalidOption(String),
    #[error("Cannot load component from '{0}': no component loader registered")]
    UnsupportedSource(String),
    #[error("The simulation has already reached the final time ({0})")]
    Finished(Time),
    #[error("The previous run failed; the system must be restarted before executing again")]
    RestartRequired,
    #[error("Simulation cancelled at t={0}")]
    Cancelled(Time),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience type for `Result<T, CosimError>`.
pub type CosimResult<T> = Result<T, CosimError>;
