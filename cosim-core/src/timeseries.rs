//! Sampled signals used to drive external inputs.
//!
//! A [`TimeSeries`] is read as a right-continuous step function:
//! the value in effect at time `t` is the value of the last sample with a time less than
//! or equal to `t`.
//! The value is held after the last sample.
//! Evaluating before the first sample is an error.

use crate::duration::TimeDuration;
use crate::errors::{CosimError, CosimResult};
use crate::state::StateValue;
use serde::{Deserialize, Serialize};

pub type Time = f64;
pub type FloatValue = f64;

/// An ordered sequence of `(time, value)` samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeSeries", into = "RawTimeSeries")]
pub struct TimeSeries {
    time: Vec<Time>,
    values: Vec<StateValue>,
}

#[derive(Serialize, Deserialize)]
struct RawTimeSeries {
    time: Vec<TimeDuration>,
    values: Vec<StateValue>,
}

impl TryFrom<RawTimeSeries> for TimeSeries {
    type Error = CosimError;

    fn try_from(raw: RawTimeSeries) -> CosimResult<Self> {
        Self::from_durations(raw.time, raw.values)
    }
}

impl From<TimeSeries> for RawTimeSeries {
    fn from(value: TimeSeries) -> Self {
        Self {
            time: value.time.into_iter().map(TimeDuration::from).collect(),
            values: value.values,
        }
    }
}

impl TimeSeries {
    /// Create a new time series
    ///
    /// The samples must be non-empty, have finite and strictly increasing times and
    /// share a single shape.
    pub fn new(time: Vec<Time>, values: Vec<StateValue>) -> CosimResult<Self> {
        if time.len() != values.len() {
            return Err(CosimError::InvalidTimeSeries(format!(
                "The lengths of fields 'time' ({}) and 'values' ({}) do not match.",
                time.len(),
                values.len()
            )));
        }
        if time.is_empty() {
            return Err(CosimError::InvalidTimeSeries(
                "A time series requires at least one sample.".to_string(),
            ));
        }
        if let Some(t) = time.iter().find(|t| !t.is_finite()) {
            return Err(CosimError::InvalidTimeSeries(format!(
                "Sample times must be finite; got {}.",
                t
            )));
        }
        if let Some(pair) = time.windows(2).find(|pair| pair[1] <= pair[0]) {
            return Err(CosimError::InvalidTimeSeries(format!(
                "Sample times must be strictly increasing; got {} after {}.",
                pair[1], pair[0]
            )));
        }
        let shape = values[0].shape();
        if let Some(value) = values.iter().find(|v| v.shape() != shape) {
            return Err(CosimError::InvalidTimeSeries(format!(
                "All samples must share the shape {}; got {}.",
                shape,
                value.shape()
            )));
        }

        Ok(Self { time, values })
    }

    /// Create a time series of scalar samples
    pub fn from_scalars(time: Vec<Time>, values: Vec<FloatValue>) -> CosimResult<Self> {
        Self::new(time, values.into_iter().map(StateValue::Scalar).collect())
    }

    /// Create a time series whose sample times are durations
    ///
    /// Durations may be given as plain seconds or as human-readable strings such as `"1h"`.
    pub fn from_durations(time: Vec<TimeDuration>, values: Vec<StateValue>) -> CosimResult<Self> {
        Self::new(time.into_iter().map(|t| t.seconds()).collect(), values)
    }

    /// Value in effect at time `t`
    pub fn at(&self, t: Time) -> CosimResult<StateValue> {
        if t.is_nan() {
            return Err(CosimError::InvalidTimeSeries(
                "Cannot evaluate a time series at NaN.".to_string(),
            ));
        }
        let start = self.start();
        if t < start {
            return Err(CosimError::TimeSeriesOutOfRange { start, time: t });
        }
        let index = self.time.partition_point(|sample| *sample <= t) - 1;
        Ok(self.values[index].clone())
    }

    /// Value in effect at a time expressed as a duration
    pub fn at_duration(&self, t: impl Into<TimeDuration>) -> CosimResult<StateValue> {
        self.at(t.into().seconds())
    }

    /// Time of the first sample
    pub fn start(&self) -> Time {
        self.time[0]
    }

    /// Time of the last sample
    pub fn end(&self) -> Time {
        self.time[self.time.len() - 1]
    }

    pub fn times(&self) -> &[Time] {
        &self.time
    }

    pub fn values(&self) -> &[StateValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Shape shared by all the samples
    pub fn shape(&self) -> crate::state::Shape {
        self.values[0].shape()
    }
}
