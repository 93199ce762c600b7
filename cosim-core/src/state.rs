use crate::errors::{CosimError, CosimResult};
use crate::timeseries::{FloatValue, Time};
use indexmap::IndexMap;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of a value exchanged between components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Scalar,
    /// A fixed-size one-dimensional array
    Array(usize),
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar => write!(f, "scalar"),
            Shape::Array(len) => write!(f, "array[{}]", len),
        }
    }
}

/// Represents a value that can be either a scalar or a fixed-size array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateValue {
    Scalar(FloatValue),
    Array(Array1<FloatValue>),
}

impl StateValue {
    /// A zero value with the given shape
    pub fn zeros(shape: Shape) -> Self {
        match shape {
            Shape::Scalar => StateValue::Scalar(0.0),
            Shape::Array(len) => StateValue::Array(Array1::zeros(len)),
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            StateValue::Scalar(_) => Shape::Scalar,
            StateValue::Array(values) => Shape::Array(values.len()),
        }
    }

    pub fn as_scalar(&self) -> Option<FloatValue> {
        match self {
            StateValue::Scalar(v) => Some(*v),
            StateValue::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array1<FloatValue>> {
        match self {
            StateValue::Scalar(_) => None,
            StateValue::Array(values) => Some(values),
        }
    }

    /// Iterate over the elements of the value
    ///
    /// A scalar yields a single element.
    pub fn iter(&self) -> Box<dyn Iterator<Item = FloatValue> + '_> {
        match self {
            StateValue::Scalar(v) => Box::new(std::iter::once(*v)),
            StateValue::Array(values) => Box::new(values.iter().copied()),
        }
    }

    /// Largest element-wise absolute difference between two values of the same shape
    pub fn max_abs_diff(&self, other: &StateValue) -> Option<FloatValue> {
        if self.shape() != other.shape() {
            return None;
        }
        Some(
            self.iter()
                .zip(other.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, FloatValue::max),
        )
    }

    /// Largest element-wise difference relative to `reference`
    ///
    /// Elements where the reference is zero fall back to the absolute difference.
    pub fn max_rel_diff(&self, reference: &StateValue) -> Option<FloatValue> {
        if self.shape() != reference.shape() {
            return None;
        }
        Some(
            self.iter()
                .zip(reference.iter())
                .map(|(a, b)| {
                    let diff = (a - b).abs();
                    if b == 0.0 {
                        diff
                    } else {
                        diff / b.abs()
                    }
                })
                .fold(0.0, FloatValue::max),
        )
    }
}

impl From<FloatValue> for StateValue {
    fn from(value: FloatValue) -> Self {
        StateValue::Scalar(value)
    }
}

impl From<Array1<FloatValue>> for StateValue {
    fn from(value: Array1<FloatValue>) -> Self {
        StateValue::Array(value)
    }
}

impl From<Vec<FloatValue>> for StateValue {
    fn from(value: Vec<FloatValue>) -> Self {
        StateValue::Array(Array1::from(value))
    }
}

/// Latest known value of every variable, keyed by name
pub type VariableStore = IndexMap<String, StateValue>;

/// Output state for a component
///
/// Keys are the names of the declared outputs.
pub type OutputState = IndexMap<String, StateValue>;

/// Input state for a component
///
/// Holds one value per declared input, evaluated at a single time point.
/// Inputs are held constant for the duration of an `execute` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputState {
    current_time: Time,
    values: IndexMap<String, StateValue>,
}

impl InputState {
    pub fn build(values: IndexMap<String, StateValue>, current_time: Time) -> Self {
        Self {
            current_time,
            values,
        }
    }

    pub fn empty() -> Self {
        Self {
            current_time: Time::NAN,
            values: IndexMap::new(),
        }
    }

    /// Add or replace the value of an input
    pub fn with_value(mut self, name: &str, value: impl Into<StateValue>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    /// Time at which the inputs were evaluated
    pub fn current_time(&self) -> Time {
        self.current_time
    }

    pub fn get(&self, name: &str) -> CosimResult<&StateValue> {
        self.values
            .get(name)
            .ok_or_else(|| CosimError::MissingVariable(name.to_string()))
    }

    /// Get the value of a scalar input
    pub fn get_scalar(&self, name: &str) -> CosimResult<FloatValue> {
        match self.get(name)? {
            StateValue::Scalar(v) => Ok(*v),
            StateValue::Array(values) => Err(CosimError::Error(format!(
                "Input '{}' is an array of length {}, expected a scalar",
                name,
                values.len()
            ))),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StateValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
