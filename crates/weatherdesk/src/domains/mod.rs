mod air_quality;
mod alerts;
mod forecasts;
mod observations;

pub use air_quality::*;
pub use alerts::*;
pub use forecasts::*;
pub use observations::*;
