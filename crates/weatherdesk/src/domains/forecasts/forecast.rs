use serde::{Deserialize, Serialize};

use crate::{
    domains::observations::reading_to_observation, ConditionReading, Coordinates, MainReading,
    Observation, ObservationError, Units, WindReading,
};

/// Provider forecasts are published in three hour slots
pub const SLOTS_PER_DAY: usize = 8;

/// One three-hour slot of a forecast payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastSlot {
    pub dt: Option<i64>,
    pub dt_txt: Option<String>,
    pub main: Option<MainReading>,
    #[serde(default)]
    pub weather: Vec<ConditionReading>,
    pub wind: Option<WindReading>,
    pub visibility: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastCity {
    pub name: Option<String>,
    pub country: Option<String>,
    pub coord: Option<Coordinates>,
}

/// Forecast payload as returned by the weather provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    #[serde(default)]
    pub list: Vec<ForecastSlot>,
    pub city: Option<ForecastCity>,
}

impl ForecastReport {
    pub fn into_observations(
        self,
        city: &str,
        units: Units,
    ) -> Result<Vec<Observation>, ObservationError> {
        self.list
            .into_iter()
            .map(|slot| {
                reading_to_observation(
                    city.to_string(),
                    units,
                    slot.dt,
                    slot.main,
                    slot.weather,
                    slot.wind,
                    slot.visibility,
                )
            })
            .collect()
    }
}

/// Number of slots to request for `days` of forecast
pub fn slot_count(days: u32) -> usize {
    days as usize * SLOTS_PER_DAY
}

/// Picks one slot per day (every eighth slot, starting with the first)
pub fn daily_slots(slots: &[Observation]) -> Vec<&Observation> {
    slots.iter().step_by(SLOTS_PER_DAY).collect()
}
