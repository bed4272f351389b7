use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AqiReading {
    pub aqi: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirPollutionEntry {
    pub main: AqiReading,
    /// Pollutant concentrations in μg/m3 keyed by name (`pm2_5`, `no2`, ...)
    #[serde(default)]
    pub components: BTreeMap<String, f64>,
    pub dt: Option<i64>,
}

/// Air pollution payload as returned by the weather provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirPollutionReport {
    #[serde(default)]
    pub list: Vec<AirPollutionEntry>,
}

impl AirPollutionReport {
    /// The provider returns a single entry for "now"; `None` if it is absent
    pub fn into_air_quality(self) -> Option<AirQuality> {
        let entry = self.list.into_iter().next()?;
        Some(AirQuality {
            aqi: entry.main.aqi,
            components: entry.components,
            measured_at: entry
                .dt
                .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok()),
        })
    }
}

/// Air quality index on the provider's 1 (good) to 5 (very poor) scale
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirQuality {
    pub aqi: u8,
    pub components: BTreeMap<String, f64>,
    pub measured_at: Option<OffsetDateTime>,
}

impl AirQuality {
    pub fn label(&self) -> &'static str {
        match self.aqi {
            1 => "Good",
            2 => "Fair",
            3 => "Moderate",
            4 => "Poor",
            5 => "Very Poor",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for AirQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AQI {} ({})", self.aqi, self.label())
    }
}

/// One match from the geocoding endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodeEntry {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub country: Option<String>,
    pub state: Option<String>,
}
