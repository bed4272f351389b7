use serde::Serialize;
use std::collections::BTreeMap;
use time::{Date, UtcOffset};

use crate::{HistoryError, HistoryRecord, HistoryStore};

/// Aggregated history for one UTC day. Temperatures are °C, wind is m/s.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: Date,
    pub observations: usize,
    pub temp_low: f64,
    pub temp_high: f64,
    pub temp_mean: f64,
    /// Mean of the rows that carried a humidity reading
    pub humidity_mean: Option<f64>,
    pub max_wind_speed: f64,
}

struct DayAccumulator {
    count: usize,
    temp_low: f64,
    temp_high: f64,
    temp_sum: f64,
    humidity_sum: f64,
    humidity_count: usize,
    max_wind_speed: f64,
}

impl DayAccumulator {
    fn new(first: &HistoryRecord) -> Self {
        Self {
            count: 0,
            temp_low: first.temp,
            temp_high: first.temp,
            temp_sum: 0.0,
            humidity_sum: 0.0,
            humidity_count: 0,
            max_wind_speed: first.wind_speed,
        }
    }

    fn add(&mut self, record: &HistoryRecord) {
        self.count += 1;
        self.temp_low = self.temp_low.min(record.temp);
        self.temp_high = self.temp_high.max(record.temp);
        self.temp_sum += record.temp;
        if let Some(humidity) = record.humidity {
            self.humidity_sum += humidity;
            self.humidity_count += 1;
        }
        self.max_wind_speed = self.max_wind_speed.max(record.wind_speed);
    }

    fn finish(self, date: Date) -> DailySummary {
        DailySummary {
            date,
            observations: self.count,
            temp_low: self.temp_low,
            temp_high: self.temp_high,
            temp_mean: self.temp_sum / self.count as f64,
            humidity_mean: (self.humidity_count > 0)
                .then(|| self.humidity_sum / self.humidity_count as f64),
            max_wind_speed: self.max_wind_speed,
        }
    }
}

/// Groups records by their UTC date, oldest day first
pub fn summarize_by_day(records: &[HistoryRecord]) -> Vec<DailySummary> {
    let mut days: BTreeMap<Date, DayAccumulator> = BTreeMap::new();
    for record in records {
        let date = record.timestamp.to_offset(UtcOffset::UTC).date();
        days.entry(date)
            .or_insert_with(|| DayAccumulator::new(record))
            .add(record);
    }
    days.into_iter()
        .map(|(date, acc)| acc.finish(date))
        .collect()
}

impl HistoryStore {
    /// Per-day trend over the same rows `query` would return
    pub fn daily_summary(
        &self,
        city: Option<&str>,
        window_days: u32,
    ) -> Result<Vec<DailySummary>, HistoryError> {
        let records = self.query(city, window_days)?;
        Ok(summarize_by_day(&records))
    }
}
