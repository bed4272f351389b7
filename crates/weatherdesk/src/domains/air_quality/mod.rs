mod air_pollution;

pub use air_pollution::*;
