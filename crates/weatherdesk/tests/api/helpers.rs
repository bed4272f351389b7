use slog::Logger;
use std::path::Path;
use std::sync::{Arc, Mutex};
use time::{Duration, OffsetDateTime};
use weatherdesk::{Clock, HistoryStore, Observation, Temperature};

/// Clock the tests move by hand
pub struct ManualClock(Mutex<OffsetDateTime>);

impl ManualClock {
    pub fn starting_at(now: OffsetDateTime) -> Arc<Self> {
        Arc::new(Self(Mutex::new(now)))
    }

    pub fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.0.lock().unwrap()
    }
}

pub fn test_logger() -> Logger {
    Logger::root(slog::Discard, slog::o!())
}

pub fn spawn_store(dir: &Path, clock: Arc<ManualClock>) -> HistoryStore {
    let store = HistoryStore::with_clock(test_logger(), dir, clock);
    store.init().expect("failed to init history store");
    store
}

pub fn observation(city: &str, temp_c: f64, condition: &str, wind: f64) -> Observation {
    Observation {
        city: city.to_string(),
        temperature: Temperature::celsius(temp_c),
        conditions: vec![condition.to_string()],
        description: None,
        wind_speed: wind,
        humidity: Some(55.0),
        pressure: Some(1013.0),
        visibility: Some(10_000.0),
        observed_at: None,
    }
}
