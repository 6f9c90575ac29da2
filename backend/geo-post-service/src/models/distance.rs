//! Search radius parsing
//!
//! A radius is a positive number with an optional unit suffix. A bare number
//! means kilometers, so `range=10` and `range=10km` are equivalent.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Kilometers,
    Meters,
    Miles,
}

impl DistanceUnit {
    fn suffix(self) -> &'static str {
        match self {
            DistanceUnit::Kilometers => "km",
            DistanceUnit::Meters => "m",
            DistanceUnit::Miles => "mi",
        }
    }

    fn meters_per_unit(self) -> f64 {
        match self {
            DistanceUnit::Kilometers => 1_000.0,
            DistanceUnit::Meters => 1.0,
            DistanceUnit::Miles => 1_609.344,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DistanceError {
    #[error("range is empty")]
    Empty,

    #[error("range is not a number: {0:?}")]
    Malformed(String),

    #[error("range must be a positive finite distance: {0:?}")]
    NotPositive(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distance {
    value: f64,
    unit: DistanceUnit,
}

impl Distance {
    pub fn kilometers(value: f64) -> Self {
        Self {
            value,
            unit: DistanceUnit::Kilometers,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> DistanceUnit {
        self.unit
    }

    pub fn as_meters(&self) -> f64 {
        self.value * self.unit.meters_per_unit()
    }
}

impl FromStr for Distance {
    type Err = DistanceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DistanceError::Empty);
        }

        let lower = trimmed.to_ascii_lowercase();
        // "km" must be checked before "m"
        let (number, unit) = if let Some(n) = lower.strip_suffix("km") {
            (n, DistanceUnit::Kilometers)
        } else if let Some(n) = lower.strip_suffix("mi") {
            (n, DistanceUnit::Miles)
        } else if let Some(n) = lower.strip_suffix('m') {
            (n, DistanceUnit::Meters)
        } else {
            (lower.as_str(), DistanceUnit::Kilometers)
        };

        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| DistanceError::Malformed(trimmed.to_string()))?;

        if !value.is_finite() || value <= 0.0 {
            return Err(DistanceError::NotPositive(trimmed.to_string()));
        }

        Ok(Self { value, unit })
    }
}

/// Elasticsearch distance notation, e.g. `200km`
impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}
