//! Externally driven inputs.
//!
//! An input that no component produces is fed by an [`ExternalInput`].
//! Each external input may hold a function of time, a [`TimeSeries`] and a constant.
//! When several are registered, they are used in that order of priority.
//! A time series queried before its first sample falls back to the constant if there is one.

use crate::errors::{CosimError, CosimResult};
use crate::state::{Shape, StateValue};
use crate::timeseries::{Time, TimeSeries};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

pub type TimeFunction = Arc<dyn Fn(Time) -> StateValue + Send + Sync>;

/// A single representation of a time-varying input
#[derive(Clone)]
pub enum InputSource {
    Function(TimeFunction),
    Series(TimeSeries),
    Constant(StateValue),
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Function(_) => write!(f, "Function(<fn>)"),
            InputSource::Series(ts) => f.debug_tuple("Series").field(ts).finish(),
            InputSource::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
        }
    }
}

impl InputSource {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(Time) -> StateValue + Send + Sync + 'static,
    {
        InputSource::Function(Arc::new(f))
    }
}

impl From<TimeSeries> for InputSource {
    fn from(value: TimeSeries) -> Self {
        InputSource::Series(value)
    }
}

impl From<StateValue> for InputSource {
    fn from(value: StateValue) -> Self {
        InputSource::Constant(value)
    }
}

impl From<f64> for InputSource {
    fn from(value: f64) -> Self {
        InputSource::Constant(StateValue::Scalar(value))
    }
}

/// The registered representations of one external input
#[derive(Clone, Default)]
pub struct ExternalInput {
    function: Option<TimeFunction>,
    series: Option<TimeSeries>,
    constant: Option<StateValue>,
}

impl fmt::Debug for ExternalInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalInput")
            .field("function", &self.function.as_ref().map(|_| "<fn>"))
            .field("series", &self.series)
            .field("constant", &self.constant)
            .finish()
    }
}

impl ExternalInput {
    /// Register a representation, replacing any previous one of the same kind
    pub fn set(&mut self, source: InputSource) {
        match source {
            InputSource::Function(f) => self.function = Some(f),
            InputSource::Series(ts) => self.series = Some(ts),
            InputSource::Constant(value) => self.constant = Some(value),
        }
    }

    /// Value of the input at time `t`
    pub fn evaluate(&self, t: Time) -> CosimResult<StateValue> {
        if let Some(f) = &self.function {
            return Ok(f(t));
        }
        if let Some(series) = &self.series {
            return match (series.at(t), &self.constant) {
                (Ok(value), _) => Ok(value),
                (Err(CosimError::TimeSeriesOutOfRange { .. }), Some(constant)) => {
                    Ok(constant.clone())
                }
                (Err(e), _) => Err(e),
            };
        }
        match &self.constant {
            Some(value) => Ok(value.clone()),
            None => Err(CosimError::Error(
                "External input has no registered source".to_string(),
            )),
        }
    }

    /// Shape of the input if it can be known without evaluation
    pub fn static_shape(&self) -> Option<Shape> {
        if self.function.is_some() {
            return None;
        }
        self.series
            .as_ref()
            .map(|ts| ts.shape())
            .or_else(|| self.constant.as_ref().map(|c| c.shape()))
    }
}

/// All external inputs of a system, keyed by variable name
#[derive(Debug, Clone, Default)]
pub struct ExternalInputs {
    inputs: IndexMap<String, ExternalInput>,
}

impl ExternalInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, source: impl Into<InputSource>) {
        self.inputs
            .entry(name.to_string())
            .or_default()
            .set(source.into());
    }

    /// Evaluate an input at `t`
    ///
    /// Returns `None` if nothing is registered for `name`.
    pub fn evaluate(&self, name: &str, t: Time) -> CosimResult<Option<StateValue>> {
        self.inputs
            .get(name)
            .map(|input| input.evaluate(t))
            .transpose()
    }

    pub fn get(&self, name: &str) -> Option<&ExternalInput> {
        self.inputs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inputs.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.inputs.keys()
    }
}
