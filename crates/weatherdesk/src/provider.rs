use anyhow::{anyhow, Context, Error};
use async_trait::async_trait;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use slog::{debug, info, Logger};
use std::time::Duration;

use crate::{
    AirPollutionReport, AirQuality, Coordinates, CurrentReport, ForecastReport, GeocodeEntry,
    Observation, Units,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

const CURRENT_PATH: &str = "/data/2.5/weather";
const FORECAST_PATH: &str = "/data/2.5/forecast";
const AIR_POLLUTION_PATH: &str = "/data/2.5/air_pollution";
const GEOCODING_PATH: &str = "/geo/1.0/direct";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const FORECAST_TIMEOUT: Duration = Duration::from_secs(15);

/// Source of weather data for the host
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// A payload missing a required field fails with an error that
    /// downcasts to [`crate::ObservationError`]
    async fn current(&self, city: &str, units: Units) -> Result<Observation, Error>;

    /// `count` three-hour slots, oldest first
    async fn forecast(
        &self,
        city: &str,
        units: Units,
        count: usize,
    ) -> Result<Vec<Observation>, Error>;

    /// Best geocoding match for `city`, if any
    async fn coordinates(&self, city: &str) -> Result<Option<Coordinates>, Error>;

    async fn air_quality(&self, lat: f64, lon: f64) -> Result<AirQuality, Error>;
}

/// OpenWeatherMap client with retrying transport
pub struct OpenWeatherClient {
    logger: Logger,
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(logger: Logger, base_url: &str, api_key: String) -> Result<Self, Error> {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let client = ClientBuilder::new(
            Client::builder()
                .user_agent(concat!("weatherdesk/", env!("CARGO_PKG_VERSION")))
                .build()?,
        )
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();

        Ok(Self {
            logger,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> Result<T, Error> {
        let url = format!("{}{}", self.base_url, path);
        // the api key stays out of the logs
        debug!(self.logger, "requesting: {}", url);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("appid", self.api_key.as_str())])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| anyhow!("error sending request: {}", e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("error response from {}: {}", path, status));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| anyhow!("error parsing body of request: {}", e))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, city: &str, units: Units) -> Result<Observation, Error> {
        let report: CurrentReport = self
            .get_json(
                CURRENT_PATH,
                &[
                    ("q", city.to_string()),
                    ("units", units.as_param().to_string()),
                ],
                REQUEST_TIMEOUT,
            )
            .await?;
        let observation = report
            .into_observation(city, units)
            .with_context(|| format!("incomplete current weather for {}", city))?;
        info!(self.logger, "fetched current weather for {}", observation.city);
        Ok(observation)
    }

    async fn forecast(
        &self,
        city: &str,
        units: Units,
        count: usize,
    ) -> Result<Vec<Observation>, Error> {
        let report: ForecastReport = self
            .get_json(
                FORECAST_PATH,
                &[
                    ("q", city.to_string()),
                    ("units", units.as_param().to_string()),
                    ("cnt", count.to_string()),
                ],
                FORECAST_TIMEOUT,
            )
            .await?;
        let slots = report
            .into_observations(city, units)
            .with_context(|| format!("incomplete forecast for {}", city))?;
        info!(self.logger, "fetched {} forecast slots for {}", slots.len(), city);
        Ok(slots)
    }

    async fn coordinates(&self, city: &str) -> Result<Option<Coordinates>, Error> {
        let matches: Vec<GeocodeEntry> = self
            .get_json(
                GEOCODING_PATH,
                &[("q", city.to_string()), ("limit", String::from("1"))],
                REQUEST_TIMEOUT,
            )
            .await?;
        Ok(matches.into_iter().next().map(|entry| Coordinates {
            lat: entry.lat,
            lon: entry.lon,
        }))
    }

    async fn air_quality(&self, lat: f64, lon: f64) -> Result<AirQuality, Error> {
        let report: AirPollutionReport = self
            .get_json(
                AIR_POLLUTION_PATH,
                &[("lat", lat.to_string()), ("lon", lon.to_string())],
                REQUEST_TIMEOUT,
            )
            .await?;
        report
            .into_air_quality()
            .ok_or_else(|| anyhow!("no air quality data for {},{}", lat, lon))
    }
}
