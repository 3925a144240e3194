//! Storage contract
//!
//! The analysis reads monitoring data and writes its results through the
//! `MonitoringStore` trait. Every write is an upsert on the stated key so that
//! re-running the analysis over the same period converges to the same records.

mod memory;

pub use memory::{MemoryStore, MetricReading};

use crate::error::AnalyzeError;
use crate::rollup::MetricSource;
use crate::types::{
    ActivitySample, RestingHeartRateRecord, SleepRecord, StatMap, StatWindow, SummaryRecord,
    UnitSystem,
};
use chrono::NaiveDateTime;

/// Attribute holding the start of the nightly sleep window (`HH:MM`)
pub const ATTR_SLEEP_PERIOD_START: &str = "sleep_period_start";

/// Attribute holding the end of the nightly sleep window (`HH:MM`)
pub const ATTR_SLEEP_PERIOD_STOP: &str = "sleep_period_stop";

/// Attribute holding the unit system
pub const ATTR_UNITS: &str = "units";

/// Trait for monitoring data stores
pub trait MonitoringStore {
    /// Activity samples with `start <= timestamp <= stop`, ordered by timestamp
    fn get_activity(
        &self,
        start: NaiveDateTime,
        stop: NaiveDateTime,
    ) -> Result<Vec<ActivitySample>, AnalyzeError>;

    /// Statistics of one provider over a day, week, month or year window.
    ///
    /// Returns an empty map when the provider has no data for the window.
    fn get_stats(
        &self,
        source: MetricSource,
        window: &StatWindow,
        units: UnitSystem,
    ) -> Result<StatMap, AnalyzeError>;

    /// Resting heart rate measured after `from`, if there is enough data
    fn get_resting_heart_rate(&self, from: NaiveDateTime) -> Result<Option<f64>, AnalyzeError>;

    /// Years with monitoring data, ascending
    fn get_years(&self) -> Result<Vec<i32>, AnalyzeError>;

    /// Days of the year (1-based) with monitoring data, ascending
    fn get_days(&self, year: i32) -> Result<Vec<u32>, AnalyzeError>;

    /// Names of the months with monitoring data, in calendar order
    fn get_month_names(&self, year: i32) -> Result<Vec<String>, AnalyzeError>;

    fn get_attribute(&self, name: &str) -> Result<Option<String>, AnalyzeError>;

    fn set_attribute(&mut self, name: &str, value: &str) -> Result<(), AnalyzeError>;

    /// Upsert keyed by timestamp
    fn upsert_sleep_record(&mut self, record: SleepRecord) -> Result<(), AnalyzeError>;

    /// Upsert keyed by day
    fn upsert_resting_heart_rate(
        &mut self,
        record: RestingHeartRateRecord,
    ) -> Result<(), AnalyzeError>;

    /// Upsert keyed by (granularity, first day)
    fn upsert_summary(&mut self, record: SummaryRecord) -> Result<(), AnalyzeError>;

    /// Set a dataset overview counter
    fn set_summary_value(&mut self, key: &str, value: i64) -> Result<(), AnalyzeError>;
}
