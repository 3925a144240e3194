//! In-memory monitoring store
//!
//! Holds a whole dataset in memory and round-trips it through a JSON snapshot.
//! Provider statistics are computed on the fly from the stored readings.

use crate::error::AnalyzeError;
use crate::rollup::MetricSource;
use crate::types::{
    ActivitySample, Granularity, RestingHeartRateRecord, SleepRecord, StatMap, StatWindow,
    SummaryRecord, UnitSystem,
};
use chrono::{Datelike, Duration, Month, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::MonitoringStore;

const FEET_PER_METER: f64 = 3.28084;

/// One timestamped metric value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricReading {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// Dataset held in memory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    attributes: BTreeMap<String, String>,
    #[serde(default)]
    activity: Vec<ActivitySample>,
    #[serde(default)]
    metrics: BTreeMap<MetricSource, Vec<MetricReading>>,
    #[serde(default)]
    sleep: Vec<SleepRecord>,
    #[serde(default)]
    resting_heart_rate: Vec<RestingHeartRateRecord>,
    #[serde(default)]
    summaries: Vec<SummaryRecord>,
    #[serde(default)]
    summary_values: BTreeMap<String, i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a JSON snapshot.
    ///
    /// Activity and readings are re-sorted. Keyed records are sorted by key and
    /// collapsed to the last entry for each key, as if upserted in order.
    pub fn from_json(json: &str) -> Result<Self, AnalyzeError> {
        let mut store: MemoryStore = serde_json::from_str(json)?;
        store.activity.sort_by_key(|s| s.timestamp);
        for readings in store.metrics.values_mut() {
            readings.sort_by_key(|r| r.timestamp);
        }
        sort_unique_by_key(&mut store.sleep, |r| r.timestamp);
        sort_unique_by_key(&mut store.resting_heart_rate, |r| r.day);
        sort_unique_by_key(&mut store.summaries, |s| (s.granularity, s.first_day));
        Ok(store)
    }

    pub fn to_json(&self) -> Result<String, AnalyzeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, AnalyzeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn add_activity(&mut self, sample: ActivitySample) {
        let at = self.activity.partition_point(|s| s.timestamp <= sample.timestamp);
        self.activity.insert(at, sample);
    }

    pub fn add_reading(&mut self, source: MetricSource, timestamp: NaiveDateTime, value: f64) {
        let readings = self.metrics.entry(source).or_default();
        let at = readings.partition_point(|r| r.timestamp <= timestamp);
        readings.insert(at, MetricReading { timestamp, value });
    }

    pub fn sleep_records(&self) -> &[SleepRecord] {
        &self.sleep
    }

    pub fn resting_heart_rates(&self) -> &[RestingHeartRateRecord] {
        &self.resting_heart_rate
    }

    pub fn summaries(&self) -> &[SummaryRecord] {
        &self.summaries
    }

    pub fn summary(&self, granularity: Granularity, first_day: NaiveDate) -> Option<&SummaryRecord> {
        self.summaries
            .iter()
            .find(|s| s.granularity == granularity && s.first_day == first_day)
    }

    pub fn summary_value(&self, key: &str) -> Option<i64> {
        self.summary_values.get(key).copied()
    }

    fn readings_in<'a>(
        &'a self,
        source: MetricSource,
        window: &'a StatWindow,
    ) -> impl Iterator<Item = f64> + 'a {
        self.metrics
            .get(&source)
            .into_iter()
            .flatten()
            .filter(move |r| window.contains(r.timestamp.date()))
            .map(|r| r.value)
    }

    /// Timestamps that count as monitoring data for the date queries
    fn monitoring_timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.activity.iter().map(|s| s.timestamp).chain(
            self.metrics
                .get(&MetricSource::Monitoring)
                .into_iter()
                .flatten()
                .map(|r| r.timestamp),
        )
    }
}

/// Sort by key keeping only the last record for each key
fn sort_unique_by_key<T, K: Ord>(records: &mut Vec<T>, key: impl Fn(&T) -> K) {
    records.reverse();
    records.sort_by_key(|r| key(r));
    records.dedup_by_key(|r| key(r));
}

/// `<prefix>_avg`, `<prefix>_min` and `<prefix>_max` of the values, or nothing
fn min_avg_max(prefix: &str, values: impl Iterator<Item = f64>) -> StatMap {
    let values: Vec<f64> = values.collect();
    let mut stats = StatMap::new();
    if values.is_empty() {
        return stats;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    stats.insert(format!("{prefix}_avg"), avg);
    stats.insert(format!("{prefix}_min"), min);
    stats.insert(format!("{prefix}_max"), max);
    stats
}

/// Single `key` holding the sum of the values, or nothing
fn total(key: &str, values: impl Iterator<Item = f64>) -> StatMap {
    let mut stats = StatMap::new();
    let mut seen = false;
    let mut sum = 0.0;
    for value in values {
        seen = true;
        sum += value;
    }
    if seen {
        stats.insert(key.to_string(), sum);
    }
    stats
}

impl MonitoringStore for MemoryStore {
    fn get_activity(
        &self,
        start: NaiveDateTime,
        stop: NaiveDateTime,
    ) -> Result<Vec<ActivitySample>, AnalyzeError> {
        Ok(self
            .activity
            .iter()
            .filter(|s| s.timestamp >= start && s.timestamp <= stop)
            .cloned()
            .collect())
    }

    fn get_stats(
        &self,
        source: MetricSource,
        window: &StatWindow,
        units: UnitSystem,
    ) -> Result<StatMap, AnalyzeError> {
        let stats = match source {
            MetricSource::HeartRate => min_avg_max("hr", self.readings_in(source, window)),
            MetricSource::RestingHeartRate => min_avg_max(
                "rhr",
                self.resting_heart_rate
                    .iter()
                    .filter(|r| window.contains(r.day))
                    .map(|r| r.resting_heart_rate),
            ),
            MetricSource::Weight => min_avg_max("weight", self.readings_in(source, window)),
            MetricSource::Stress => min_avg_max("stress", self.readings_in(source, window)),
            MetricSource::Climb => {
                let scale = if units.is_alternate() { FEET_PER_METER } else { 1.0 };
                total("ascent", self.readings_in(source, window).map(|m| m * scale))
            }
            MetricSource::IntensityMinutes => {
                total("intensity_time", self.readings_in(source, window))
            }
            MetricSource::Monitoring => total("steps", self.readings_in(source, window)),
        };
        Ok(stats)
    }

    fn get_resting_heart_rate(&self, from: NaiveDateTime) -> Result<Option<f64>, AnalyzeError> {
        let until = from + Duration::hours(1);
        Ok(self
            .metrics
            .get(&MetricSource::HeartRate)
            .into_iter()
            .flatten()
            .filter(|r| r.timestamp >= from && r.timestamp < until)
            .map(|r| r.value)
            .reduce(f64::min))
    }

    fn get_years(&self) -> Result<Vec<i32>, AnalyzeError> {
        let years: BTreeSet<i32> = self.monitoring_timestamps().map(|ts| ts.year()).collect();
        Ok(years.into_iter().collect())
    }

    fn get_days(&self, year: i32) -> Result<Vec<u32>, AnalyzeError> {
        let days: BTreeSet<u32> = self
            .monitoring_timestamps()
            .filter(|ts| ts.year() == year)
            .map(|ts| ts.ordinal())
            .collect();
        Ok(days.into_iter().collect())
    }

    fn get_month_names(&self, year: i32) -> Result<Vec<String>, AnalyzeError> {
        let months: BTreeSet<u32> = self
            .monitoring_timestamps()
            .filter(|ts| ts.year() == year)
            .map(|ts| ts.month())
            .collect();
        Ok(months
            .into_iter()
            .filter_map(|m| Month::try_from(m as u8).ok())
            .map(|m| m.name().to_string())
            .collect())
    }

    fn get_attribute(&self, name: &str) -> Result<Option<String>, AnalyzeError> {
        Ok(self.attributes.get(name).cloned())
    }

    fn set_attribute(&mut self, name: &str, value: &str) -> Result<(), AnalyzeError> {
        self.attributes.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn upsert_sleep_record(&mut self, record: SleepRecord) -> Result<(), AnalyzeError> {
        match self.sleep.binary_search_by_key(&record.timestamp, |r| r.timestamp) {
            Ok(i) => self.sleep[i] = record,
            Err(i) => self.sleep.insert(i, record),
        }
        Ok(())
    }

    fn upsert_resting_heart_rate(
        &mut self,
        record: RestingHeartRateRecord,
    ) -> Result<(), AnalyzeError> {
        match self.resting_heart_rate.binary_search_by_key(&record.day, |r| r.day) {
            Ok(i) => self.resting_heart_rate[i] = record,
            Err(i) => self.resting_heart_rate.insert(i, record),
        }
        Ok(())
    }

    fn upsert_summary(&mut self, record: SummaryRecord) -> Result<(), AnalyzeError> {
        let key = (record.granularity, record.first_day);
        match self
            .summaries
            .binary_search_by_key(&key, |s| (s.granularity, s.first_day))
        {
            Ok(i) => self.summaries[i] = record,
            Err(i) => self.summaries.insert(i, record),
        }
        Ok(())
    }

    fn set_summary_value(&mut self, key: &str, value: i64) -> Result<(), AnalyzeError> {
        self.summary_values.insert(key.to_string(), value);
        Ok(())
    }
}
