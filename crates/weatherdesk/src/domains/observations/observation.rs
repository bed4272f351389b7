use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use time::OffsetDateTime;

/// Imperial wind speeds arrive in miles per hour
const METERS_PER_SECOND_PER_MPH: f64 = 0.44704;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ObservationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Condition list is empty, no primary condition at index 0")]
    EmptyConditions,
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: f64 },
}

/// Measurement system requested from the weather provider
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    /// Value of the provider's `units` query parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    pub fn temperature_unit(&self) -> TemperatureUnit {
        match self {
            Units::Metric => TemperatureUnit::Celsius,
            Units::Imperial => TemperatureUnit::Fahrenheit,
        }
    }

    /// Converts a provider wind reading into meters per second
    pub fn wind_to_ms(&self, speed: f64) -> f64 {
        match self {
            Units::Metric => speed,
            Units::Imperial => speed * METERS_PER_SECOND_PER_MPH,
        }
    }

    pub fn toggled(&self) -> Units {
        match self {
            Units::Metric => Units::Imperial,
            Units::Imperial => Units::Metric,
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_param())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            other => Err(format!("unknown units '{}', expected metric or imperial", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

/// A temperature reading tagged with the unit it was observed in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub value: f64,
    pub unit: TemperatureUnit,
}

impl Temperature {
    pub fn celsius(value: f64) -> Self {
        Self {
            value,
            unit: TemperatureUnit::Celsius,
        }
    }

    pub fn fahrenheit(value: f64) -> Self {
        Self {
            value,
            unit: TemperatureUnit::Fahrenheit,
        }
    }

    /// The reading expressed in degrees Celsius
    pub fn as_celsius(&self) -> f64 {
        match self.unit {
            TemperatureUnit::Celsius => self.value,
            TemperatureUnit::Fahrenheit => (self.value - 32.0) * 5.0 / 9.0,
        }
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.symbol())
    }
}

/// One weather snapshot for a city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub city: String,
    pub temperature: Temperature,
    /// Weather phenomena as reported, primary first
    pub conditions: Vec<String>,
    /// Longer human readable description of the primary condition
    pub description: Option<String>,
    /// Meters per second
    pub wind_speed: f64,
    pub humidity: Option<f64>,
    /// hPa
    pub pressure: Option<f64>,
    /// Meters
    pub visibility: Option<f64>,
    /// Time the provider reports the reading was taken
    #[serde(with = "time::serde::rfc3339::option")]
    pub observed_at: Option<OffsetDateTime>,
}

impl Observation {
    /// First entry of the condition list
    pub fn primary_condition(&self) -> Result<&str, ObservationError> {
        self.conditions
            .first()
            .map(String::as_str)
            .ok_or(ObservationError::EmptyConditions)
    }

    /// Visibility converted to kilometers, absent readings count as 0
    pub fn visibility_km(&self) -> f64 {
        self.visibility.unwrap_or(0.0) / 1000.0
    }
}
