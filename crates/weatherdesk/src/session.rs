use anyhow::{Context, Error};
use serde::Serialize;
use slog::{debug, info, warn, Logger};
use std::sync::Arc;

use crate::{
    daily_slots, evaluate, slot_count, AirQuality, AlertDispatcher, AlertSet, HistoryRecord,
    HistoryStore, IndicatorState, Observation, ObservationError, Units, WeatherProvider,
};

/// Everything one refresh produced, handed back to the host instead of
/// being kept as shared state
#[derive(Debug, Clone, Serialize)]
pub struct CurrentSnapshot {
    pub observation: Observation,
    pub alerts: AlertSet,
    pub indicator: IndicatorState,
    /// `None` when the history append failed; the refresh still counts
    pub record: Option<HistoryRecord>,
}

/// Host flow: provider -> evaluator -> dispatcher -> history
pub struct Session {
    logger: Logger,
    provider: Arc<dyn WeatherProvider>,
    store: HistoryStore,
    dispatcher: AlertDispatcher,
    units: Units,
}

impl Session {
    pub fn new(
        logger: Logger,
        provider: Arc<dyn WeatherProvider>,
        store: HistoryStore,
        dispatcher: AlertDispatcher,
        units: Units,
    ) -> Self {
        Self {
            logger,
            provider,
            store,
            dispatcher,
            units,
        }
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub fn units(&self) -> Units {
        self.units
    }

    /// Switches between metric and imperial for the following requests
    pub fn toggle_units(&mut self) -> Units {
        self.units = self.units.toggled();
        info!(self.logger, "units switched to {}", self.units);
        self.units
    }

    /// Fetches current conditions for `city`, raises alerts and records the
    /// observation.
    ///
    /// A provider failure means "no data" and yields `Ok(None)`. A payload
    /// missing a required field, or an observation the alert rules cannot
    /// evaluate, is returned as an error and nothing is recorded.
    pub async fn refresh(&mut self, city: &str) -> Result<Option<CurrentSnapshot>, Error> {
        let observation = match self.provider.current(city, self.units).await {
            Ok(observation) => observation,
            Err(e) if e.downcast_ref::<ObservationError>().is_some() => {
                return Err(e.context(format!("cannot evaluate alerts for {}", city)));
            }
            Err(e) => {
                warn!(self.logger, "no weather data for {}: {:#}", city, e);
                return Ok(None);
            }
        };

        let alerts = evaluate(&observation)
            .with_context(|| format!("cannot evaluate alerts for {}", city))?;
        let indicator = self.dispatcher.dispatch(&alerts);

        if let Err(e) = self.store.save_location(city) {
            warn!(self.logger, "failed to save location {}: {}", city, e);
        }
        let record = match self.store.append(city, &observation) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(self.logger, "failed to record history for {}: {}", city, e);
                None
            }
        };

        debug!(
            self.logger,
            "refreshed {}: {} alert(s), indicator {:?}",
            city,
            alerts.len(),
            indicator
        );
        Ok(Some(CurrentSnapshot {
            observation,
            alerts,
            indicator,
            record,
        }))
    }

    /// One observation per day for the next `days` days, or `None` when the
    /// provider has no data
    pub async fn daily_forecast(&self, city: &str, days: u32) -> Option<Vec<Observation>> {
        match self
            .provider
            .forecast(city, self.units, slot_count(days))
            .await
        {
            Ok(slots) => Some(daily_slots(&slots).into_iter().cloned().collect()),
            Err(e) => {
                warn!(self.logger, "no forecast for {}: {:#}", city, e);
                None
            }
        }
    }

    /// Geocodes `city` and looks up its air quality
    pub async fn air_quality(&self, city: &str) -> Option<AirQuality> {
        let coordinates = match self.provider.coordinates(city).await {
            Ok(Some(coordinates)) => coordinates,
            Ok(None) => {
                warn!(self.logger, "could not locate {}", city);
                return None;
            }
            Err(e) => {
                warn!(self.logger, "geocoding failed for {}: {:#}", city, e);
                return None;
            }
        };
        match self
            .provider
            .air_quality(coordinates.lat, coordinates.lon)
            .await
        {
            Ok(air) => Some(air),
            Err(e) => {
                warn!(self.logger, "no air quality data for {}: {:#}", city, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Coordinates, MockAlertIndicator, MockNotificationSink, MockWeatherProvider, Temperature,
    };
    use anyhow::anyhow;
    use mockall::predicate::eq;
    use std::collections::BTreeMap;
    use std::fs;

    fn logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    fn observation(city: &str, temp: f64, condition: &str, wind: f64) -> Observation {
        Observation {
            city: city.to_string(),
            temperature: Temperature::celsius(temp),
            conditions: if condition.is_empty() {
                vec![]
            } else {
                vec![condition.to_string()]
            },
            description: None,
            wind_speed: wind,
            humidity: Some(40.0),
            pressure: Some(1008.0),
            visibility: Some(8_000.0),
            observed_at: None,
        }
    }

    fn quiet_dispatcher() -> AlertDispatcher {
        let mut indicator = MockAlertIndicator::new();
        indicator.expect_set_state().return_const(());
        let mut notifier = MockNotificationSink::new();
        notifier.expect_notify().returning(|_, _, _| Ok(()));
        AlertDispatcher::new(logger(), Box::new(indicator), Box::new(notifier))
    }

    fn session(dir: &std::path::Path, provider: MockWeatherProvider, dispatcher: AlertDispatcher) -> Session {
        let store = HistoryStore::new(logger(), dir);
        store.init().unwrap();
        Session::new(logger(), Arc::new(provider), store, dispatcher, Units::Metric)
    }

    #[tokio::test]
    async fn refresh_alerts_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = MockWeatherProvider::new();
        provider
            .expect_current()
            .withf(|city, units| city == "Dubai" && *units == Units::Metric)
            .times(1)
            .returning(|city, _| Ok(observation(city, 38.0, "Thunderstorm", 12.0)));

        let mut indicator = MockAlertIndicator::new();
        indicator
            .expect_set_state()
            .with(eq(IndicatorState::Warning))
            .times(1)
            .return_const(());
        let mut notifier = MockNotificationSink::new();
        notifier.expect_notify().times(1).returning(|_, _, _| Ok(()));
        let dispatcher = AlertDispatcher::new(logger(), Box::new(indicator), Box::new(notifier));

        let mut session = session(dir.path(), provider, dispatcher);
        let snapshot = session.refresh("Dubai").await.unwrap().unwrap();

        assert_eq!(snapshot.alerts.len(), 3);
        assert_eq!(snapshot.indicator, IndicatorState::Warning);
        let record = snapshot.record.unwrap();
        assert_eq!(record.temp, 38.0);
        assert_eq!(record.visibility_km, 8.0);

        assert_eq!(session.store().query(Some("Dubai"), 1).unwrap(), vec![record]);
        assert_eq!(session.store().list_locations().unwrap(), vec!["Dubai"]);
    }

    #[tokio::test]
    async fn provider_failure_means_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = MockWeatherProvider::new();
        provider
            .expect_current()
            .returning(|_, _| Err(anyhow!("connection refused")));

        let mut indicator = MockAlertIndicator::new();
        indicator.expect_set_state().never();
        let mut notifier = MockNotificationSink::new();
        notifier.expect_notify().never();
        let dispatcher = AlertDispatcher::new(logger(), Box::new(indicator), Box::new(notifier));

        let mut session = session(dir.path(), provider, dispatcher);
        assert!(session.refresh("Dubai").await.unwrap().is_none());
        assert!(session.store().all_records().unwrap().is_empty());
        assert!(session.store().list_locations().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_observation_is_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = MockWeatherProvider::new();
        provider
            .expect_current()
            .returning(|city, _| Ok(observation(city, 20.0, "", 3.0)));

        let mut session = session(dir.path(), provider, quiet_dispatcher());
        assert!(session.refresh("Dubai").await.is_err());
        assert!(session.store().all_records().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_payload_field_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = MockWeatherProvider::new();
        provider.expect_current().returning(|city, _| {
            Err(anyhow::Error::new(ObservationError::MissingField("main"))
                .context(format!("incomplete current weather for {}", city)))
        });

        let mut indicator = MockAlertIndicator::new();
        indicator.expect_set_state().never();
        let mut notifier = MockNotificationSink::new();
        notifier.expect_notify().never();
        let dispatcher = AlertDispatcher::new(logger(), Box::new(indicator), Box::new(notifier));

        let mut session = session(dir.path(), provider, dispatcher);
        let err = session.refresh("Dubai").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ObservationError>(),
            Some(&ObservationError::MissingField("main"))
        );
        assert!(session.store().all_records().unwrap().is_empty());
        assert!(session.store().list_locations().unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_failure_does_not_fail_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = MockWeatherProvider::new();
        provider
            .expect_current()
            .returning(|city, _| Ok(observation(city, 20.0, "Clear", 3.0)));

        let mut session = session(dir.path(), provider, quiet_dispatcher());
        // a directory where the log should be cannot be repaired by init
        fs::remove_file(&session.store().paths().history).unwrap();
        fs::create_dir(&session.store().paths().history).unwrap();

        let snapshot = session.refresh("Dubai").await.unwrap().unwrap();
        assert!(snapshot.alerts.is_empty());
        assert!(snapshot.record.is_none());
    }

    #[tokio::test]
    async fn toggled_units_reach_the_provider() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = MockWeatherProvider::new();
        provider
            .expect_current()
            .withf(|_, units| *units == Units::Imperial)
            .times(1)
            .returning(|city, _| {
                let mut obs = observation(city, 100.4, "Clear", 0.0);
                obs.temperature = Temperature::fahrenheit(100.4);
                Ok(obs)
            });

        let mut session = session(dir.path(), provider, quiet_dispatcher());
        assert_eq!(session.toggle_units(), Units::Imperial);

        let snapshot = session.refresh("Phoenix").await.unwrap().unwrap();
        assert_eq!(
            snapshot.alerts.messages(),
            vec!["High temperature warning: 100.4°F"]
        );
        assert!((snapshot.record.unwrap().temp - 38.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn daily_forecast_picks_one_slot_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = MockWeatherProvider::new();
        provider
            .expect_forecast()
            .withf(|_, _, count| *count == 24)
            .returning(|city, _, count| {
                Ok((0..count)
                    .map(|i| observation(city, i as f64, "Clouds", 1.0))
                    .collect())
            });

        let session = session(dir.path(), provider, quiet_dispatcher());
        let days = session.daily_forecast("Riga", 3).await.unwrap();
        assert_eq!(
            days.iter().map(|o| o.temperature.value).collect::<Vec<_>>(),
            vec![0.0, 8.0, 16.0]
        );
    }

    #[tokio::test]
    async fn air_quality_geocodes_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = MockWeatherProvider::new();
        provider
            .expect_coordinates()
            .returning(|_| Ok(Some(Coordinates { lat: 1.5, lon: 2.5 })));
        provider
            .expect_air_quality()
            .with(eq(1.5), eq(2.5))
            .returning(|_, _| {
                Ok(AirQuality {
                    aqi: 2,
                    components: BTreeMap::new(),
                    measured_at: None,
                })
            });

        let session = session(dir.path(), provider, quiet_dispatcher());
        assert_eq!(session.air_quality("Accra").await.unwrap().label(), "Fair");
    }

    #[tokio::test]
    async fn unknown_city_has_no_air_quality() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = MockWeatherProvider::new();
        provider.expect_coordinates().returning(|_| Ok(None));
        provider.expect_air_quality().never();

        let session = session(dir.path(), provider, quiet_dispatcher());
        assert!(session.air_quality("Atlantis").await.is_none());
    }
}
