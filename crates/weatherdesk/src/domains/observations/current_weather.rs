use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Observation, ObservationError, Temperature, Units};

/// `main` block of a provider reading
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MainReading {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
}

/// One entry of the provider's `weather` list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionReading {
    pub main: String,
    pub description: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindReading {
    pub speed: Option<f64>,
    pub deg: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Current conditions payload as returned by the weather provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentReport {
    pub name: Option<String>,
    pub dt: Option<i64>,
    pub coord: Option<Coordinates>,
    pub main: Option<MainReading>,
    #[serde(default)]
    pub weather: Vec<ConditionReading>,
    pub wind: Option<WindReading>,
    pub visibility: Option<f64>,
}

impl CurrentReport {
    /// Builds an [`Observation`] for `city`, failing when a field the alert
    /// rules depend on is absent.
    pub fn into_observation(self, city: &str, units: Units) -> Result<Observation, ObservationError> {
        let city = if city.trim().is_empty() {
            self.name.clone().unwrap_or_default()
        } else {
            city.to_string()
        };
        if city.trim().is_empty() {
            return Err(ObservationError::MissingField("name"));
        }

        reading_to_observation(
            city,
            units,
            self.dt,
            self.main,
            self.weather,
            self.wind,
            self.visibility,
        )
    }
}

pub(crate) fn reading_to_observation(
    city: String,
    units: Units,
    dt: Option<i64>,
    main: Option<MainReading>,
    weather: Vec<ConditionReading>,
    wind: Option<WindReading>,
    visibility: Option<f64>,
) -> Result<Observation, ObservationError> {
    let main = main.ok_or(ObservationError::MissingField("main"))?;
    let temp = main
        .temp
        .ok_or(ObservationError::MissingField("main.temp"))?;
    let wind = wind.ok_or(ObservationError::MissingField("wind"))?;
    let wind_speed = wind
        .speed
        .ok_or(ObservationError::MissingField("wind.speed"))?;

    let temperature = Temperature {
        value: temp,
        unit: units.temperature_unit(),
    };
    let description = weather.first().and_then(|w| w.description.clone());

    Ok(Observation {
        city,
        temperature,
        conditions: weather.into_iter().map(|w| w.main).collect(),
        description,
        wind_speed: units.wind_to_ms(wind_speed),
        humidity: main.humidity,
        pressure: main.pressure,
        visibility,
        observed_at: dt.and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok()),
    })
}
