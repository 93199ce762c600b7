//! Durations expressed either as a number of seconds or as a human-readable string.
//!
//! Strings are a sequence of `<number><unit>` terms separated by optional whitespace,
//! e.g. `"70.6s"`, `"1h 30m"` or `"1d 23m 2ms"`.
//! A bare number is read as seconds.
//!
//! | unit                                    | seconds      |
//! |-----------------------------------------|--------------|
//! | `us`, `µs`, `microsecond(s)`            | 1e-6         |
//! | `ms`, `millisecond(s)`                  | 1e-3         |
//! | `s`, `sec(s)`, `second(s)`              | 1            |
//! | `m`, `min(s)`, `minute(s)`              | 60           |
//! | `h`, `hr(s)`, `hour(s)`                 | 3 600        |
//! | `d`, `day(s)`                           | 86 400       |
//! | `w`, `week(s)`                          | 604 800      |
//! | `mo`, `month(s)`                        | 2 629 800    |
//! | `y`, `yr(s)`, `year(s)`                 | 31 557 600   |
//!
//! Months and years use the Julian year of 365.25 days.

use crate::errors::{CosimError, CosimResult};
use crate::timeseries::Time;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MINUTE: f64 = 60.0;
const HOUR: f64 = 60.0 * MINUTE;
const DAY: f64 = 24.0 * HOUR;
const WEEK: f64 = 7.0 * DAY;
const YEAR: f64 = 365.25 * DAY;
const MONTH: f64 = YEAR / 12.0;

/// A duration in seconds
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "DurationValue", into = "f64")]
pub struct TimeDuration(Time);

/// A duration as written by a user, either seconds or a duration string
///
/// The value is only parsed by [`DurationValue::to_duration`], so configurations holding
/// a malformed string can be loaded and reported on later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(f64),
    Text(String),
}

impl Default for DurationValue {
    fn default() -> Self {
        DurationValue::Seconds(0.0)
    }
}

impl DurationValue {
    pub fn to_duration(&self) -> CosimResult<TimeDuration> {
        match self {
            DurationValue::Seconds(value) => Ok(TimeDuration(*value)),
            DurationValue::Text(text) => text.parse(),
        }
    }
}

impl From<f64> for DurationValue {
    fn from(value: f64) -> Self {
        DurationValue::Seconds(value)
    }
}

impl From<i32> for DurationValue {
    fn from(value: i32) -> Self {
        DurationValue::Seconds(value as f64)
    }
}

impl From<&str> for DurationValue {
    fn from(value: &str) -> Self {
        DurationValue::Text(value.to_string())
    }
}

impl From<String> for DurationValue {
    fn from(value: String) -> Self {
        DurationValue::Text(value)
    }
}

impl From<TimeDuration> for DurationValue {
    fn from(value: TimeDuration) -> Self {
        DurationValue::Seconds(value.0)
    }
}

impl TryFrom<DurationValue> for TimeDuration {
    type Error = CosimError;

    fn try_from(value: DurationValue) -> CosimResult<Self> {
        value.to_duration()
    }
}

impl From<TimeDuration> for f64 {
    fn from(value: TimeDuration) -> Self {
        value.0
    }
}

impl From<f64> for TimeDuration {
    fn from(value: f64) -> Self {
        TimeDuration(value)
    }
}

impl From<i32> for TimeDuration {
    fn from(value: i32) -> Self {
        TimeDuration(value as f64)
    }
}

impl TryFrom<&str> for TimeDuration {
    type Error = CosimError;

    fn try_from(value: &str) -> CosimResult<Self> {
        value.parse()
    }
}

fn unit_in_seconds(unit: &str) -> Option<f64> {
    let seconds = match unit {
        "us" | "µs" | "microsecond" | "microseconds" => 1e-6,
        "ms" | "millisecond" | "milliseconds" => 1e-3,
        "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        "m" | "min" | "mins" | "minute" | "minutes" => MINUTE,
        "h" | "hr" | "hrs" | "hour" | "hours" => HOUR,
        "d" | "day" | "days" => DAY,
        "w" | "week" | "weeks" => WEEK,
        "mo" | "month" | "months" => MONTH,
        "y" | "yr" | "yrs" | "year" | "years" => YEAR,
        _ => return None,
    };
    Some(seconds)
}

impl FromStr for TimeDuration {
    type Err = CosimError;

    fn from_str(s: &str) -> CosimResult<Self> {
        let invalid = |reason: &str| CosimError::InvalidDuration {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let text = s.trim();
        if text.is_empty() {
            return Err(invalid("empty duration"));
        }
        if let Ok(seconds) = text.parse::<f64>() {
            return Ok(TimeDuration(seconds));
        }

        let mut total = 0.0;
        let mut rest = text;
        while !rest.is_empty() {
            let number_end = rest
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(rest.len());
            if number_end == 0 {
                return Err(invalid("expected a number"));
            }
            let number: f64 = rest[..number_end]
                .parse()
                .map_err(|_| invalid("malformed number"))?;
            rest = rest[number_end..].trim_start();

            let unit_end = rest
                .find(|c: char| !c.is_alphabetic())
                .unwrap_or(rest.len());
            if unit_end == 0 {
                return Err(invalid("missing unit"));
            }
            let unit = &rest[..unit_end];
            let factor = unit_in_seconds(unit)
                .ok_or_else(|| invalid(&format!("unknown unit '{}'", unit)))?;
            total += number * factor;
            rest = rest[unit_end..].trim_start();
        }

        Ok(TimeDuration(total))
    }
}

impl fmt::Display for TimeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} s", self.0)
    }
}

impl TimeDuration {
    pub fn new(seconds: Time) -> Self {
        TimeDuration(seconds)
    }

    pub fn microseconds(&self) -> f64 {
        self.0 * 1e6
    }

    pub fn milliseconds(&self) -> f64 {
        self.0 * 1e3
    }

    pub fn seconds(&self) -> f64 {
        self.0
    }

    pub fn minutes(&self) -> f64 {
        self.0 / MINUTE
    }

    pub fn hours(&self) -> f64 {
        self.0 / HOUR
    }

    pub fn days(&self) -> f64 {
        self.0 / DAY
    }

    pub fn weeks(&self) -> f64 {
        self.0 / WEEK
    }

    pub fn months(&self) -> f64 {
        self.0 / MONTH
    }

    pub fn years(&self) -> f64 {
        self.0 / YEAR
    }
}
