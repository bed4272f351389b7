mod current_weather;
mod observation;

pub(crate) use current_weather::reading_to_observation;
pub use current_weather::{
    ConditionReading, Coordinates, CurrentReport, MainReading, WindReading,
};
pub use observation::*;
