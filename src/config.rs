//! Analysis configuration
//!
//! The nightly sleep window and the unit system are stored as attributes in the
//! monitoring store. Classification refuses to run without a sleep window.

use crate::error::AnalyzeError;
use crate::periods::{PeriodAlignment, SearchWindow};
use crate::store::{MonitoringStore, ATTR_SLEEP_PERIOD_START, ATTR_SLEEP_PERIOD_STOP, ATTR_UNITS};
use crate::types::UnitSystem;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Padding added on both sides of the sleep window when searching for sleep
pub const SEARCH_PADDING_HOURS: i64 = 2;

/// Parse a `HH:MM` or `HH:MM:SS` time of day
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, AnalyzeError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| AnalyzeError::InvalidTime(value.to_string()))
}

/// Nominal nightly sleep window: `start` on a day to `stop` on the next day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepPeriod {
    pub start: NaiveTime,
    pub stop: NaiveTime,
}

impl SleepPeriod {
    pub fn new(start: NaiveTime, stop: NaiveTime) -> Self {
        Self { start, stop }
    }

    /// Parse `"HH:MM,HH:MM"`
    pub fn parse(value: &str) -> Result<Self, AnalyzeError> {
        let (start, stop) = value
            .split_once(',')
            .ok_or_else(|| AnalyzeError::InvalidTime(value.to_string()))?;
        Ok(Self::new(parse_time_of_day(start)?, parse_time_of_day(stop)?))
    }

    /// Read the window from the store's attributes
    pub fn from_store(store: &dyn MonitoringStore) -> Result<Self, AnalyzeError> {
        let read = |name: &str| -> Result<NaiveTime, AnalyzeError> {
            let value = store
                .get_attribute(name)?
                .ok_or_else(|| AnalyzeError::MissingAttribute(name.to_string()))?;
            parse_time_of_day(&value).map_err(|_| AnalyzeError::InvalidAttribute {
                name: name.to_string(),
                value,
            })
        };
        Ok(Self::new(read(ATTR_SLEEP_PERIOD_START)?, read(ATTR_SLEEP_PERIOD_STOP)?))
    }

    /// Write the window to the store's attributes
    pub fn save(&self, store: &mut dyn MonitoringStore) -> Result<(), AnalyzeError> {
        store.set_attribute(ATTR_SLEEP_PERIOD_START, &self.start.format("%H:%M").to_string())?;
        store.set_attribute(ATTR_SLEEP_PERIOD_STOP, &self.stop.format("%H:%M").to_string())
    }

    /// Window searched for the night starting on `day`, padded on both sides
    pub fn search_window(&self, day: NaiveDate) -> SearchWindow {
        let padding = Duration::hours(SEARCH_PADDING_HOURS);
        let start = day.and_time(self.start) - padding;
        let stop = (day + Duration::days(1)).and_time(self.stop) + padding;
        SearchWindow::new(start, stop)
    }

    /// Start of the resting heart rate search for `day`
    pub fn resting_heart_rate_from(&self, day: NaiveDate) -> NaiveDateTime {
        day.and_time(self.stop)
    }
}

/// Everything the analysis needs besides the data itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeConfig {
    pub sleep_period: SleepPeriod,
    pub units: UnitSystem,
    #[serde(default)]
    pub alignment: PeriodAlignment,
}

impl AnalyzeConfig {
    /// Load the configuration from store attributes.
    ///
    /// Fails with `MissingAttribute` when the sleep window is not set.
    pub fn from_store(
        store: &dyn MonitoringStore,
        alignment: PeriodAlignment,
    ) -> Result<Self, AnalyzeError> {
        let sleep_period = SleepPeriod::from_store(store)?;
        let units = store
            .get_attribute(ATTR_UNITS)?
            .map(|u| UnitSystem::from_attribute(&u))
            .unwrap_or_default();
        Ok(Self {
            sleep_period,
            units,
            alignment,
        })
    }
}
