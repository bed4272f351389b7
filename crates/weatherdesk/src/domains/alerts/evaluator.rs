use serde::Serialize;
use std::fmt;

use crate::{Observation, ObservationError};

/// Readings above this (°C) raise a high temperature warning
pub const HIGH_TEMPERATURE_C: f64 = 35.0;
/// Readings below this (°C) raise a low temperature warning
pub const LOW_TEMPERATURE_C: f64 = 5.0;
/// Wind above this (m/s) raises a high wind warning
pub const HIGH_WIND_MS: f64 = 10.0;
/// Primary conditions that always raise an alert
pub const SEVERE_CONDITIONS: [&str; 2] = ["Thunderstorm", "Extreme"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertKind {
    HighTemperature,
    LowTemperature,
    SevereCondition,
    HighWind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Alerts raised for one observation, in rule order: temperature, condition, wind
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertSet {
    alerts: Vec<Alert>,
}

impl AlertSet {
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn has_alerts(&self) -> bool {
        !self.alerts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.alerts.iter().map(|a| a.message.as_str()).collect()
    }

    pub fn kinds(&self) -> Vec<AlertKind> {
        self.alerts.iter().map(|a| a.kind).collect()
    }

    /// Body of the desktop notification: one message per line
    pub fn notification_body(&self) -> String {
        self.messages().join("\n")
    }

    /// Text shown when the user asks for the active alerts
    pub fn summary(&self) -> String {
        if self.alerts.is_empty() {
            return String::from("No active weather alerts");
        }
        self.alerts
            .iter()
            .map(|a| format!("• {}", a.message))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn push(&mut self, kind: AlertKind, message: String) {
        self.alerts.push(Alert { kind, message });
    }
}

/// Runs the alert rules against one observation.
///
/// Rules are independent and any subset may fire. Thresholds are strict:
/// 35°C, 5°C and 10 m/s themselves are considered normal. Temperatures in
/// Fahrenheit are compared after conversion to Celsius.
///
/// An empty condition list or a negative/non-finite reading is an error;
/// no partial set is returned.
pub fn evaluate(observation: &Observation) -> Result<AlertSet, ObservationError> {
    let condition = observation.primary_condition()?;
    let temperature = observation.temperature;
    if !temperature.value.is_finite() {
        return Err(ObservationError::InvalidValue {
            field: "temperature",
            value: temperature.value,
        });
    }
    let wind_speed = observation.wind_speed;
    if !wind_speed.is_finite() || wind_speed < 0.0 {
        return Err(ObservationError::InvalidValue {
            field: "wind_speed",
            value: wind_speed,
        });
    }

    let mut alerts = AlertSet::default();

    let celsius = temperature.as_celsius();
    if celsius > HIGH_TEMPERATURE_C {
        alerts.push(
            AlertKind::HighTemperature,
            format!("High temperature warning: {}", temperature),
        );
    } else if celsius < LOW_TEMPERATURE_C {
        alerts.push(
            AlertKind::LowTemperature,
            format!("Low temperature warning: {}", temperature),
        );
    }

    if SEVERE_CONDITIONS.contains(&condition) {
        alerts.push(
            AlertKind::SevereCondition,
            format!("Weather alert: {}", condition),
        );
    }

    if wind_speed > HIGH_WIND_MS {
        alerts.push(
            AlertKind::HighWind,
            format!("High wind warning: {} m/s", wind_speed),
        );
    }

    Ok(alerts)
}
