use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::Observation;

/// Column order of the history log
pub const HISTORY_HEADER: [&str; 8] = [
    "city",
    "temp",
    "humidity",
    "conditions",
    "pressure",
    "wind_speed",
    "visibility",
    "timestamp",
];

/// One row of the history log
///
/// Temperatures are stored in Celsius and wind speed in m/s regardless of
/// the units the observation was fetched in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub city: String,
    pub temp: f64,
    pub humidity: Option<f64>,
    pub conditions: String,
    pub pressure: Option<f64>,
    pub wind_speed: f64,
    #[serde(rename = "visibility")]
    pub visibility_km: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl HistoryRecord {
    pub fn from_observation(city: &str, observation: &Observation, timestamp: OffsetDateTime) -> Self {
        Self {
            city: city.to_string(),
            temp: observation.temperature.as_celsius(),
            humidity: observation.humidity,
            conditions: observation.conditions.first().cloned().unwrap_or_default(),
            pressure: observation.pressure,
            wind_speed: observation.wind_speed,
            visibility_km: observation.visibility_km(),
            timestamp,
        }
    }
}
