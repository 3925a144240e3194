//! Run reports
//!
//! Collects what one analysis sweep did: nights classified, rollups written and
//! the periods that failed. Reports carry a unique run id for provenance.

use crate::classifier::SleepClassification;
use crate::error::AnalyzeError;
use crate::gaps::DayCoverage;
use crate::types::{Granularity, StatWindow};
use crate::{ANALYZE_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A period whose processing was aborted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodFailure {
    pub period: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<Granularity>,
    pub error: String,
}

/// Summary of one sweep over the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub producer: String,
    pub version: String,
    pub run_id: String,
    pub started_at_utc: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at_utc: Option<DateTime<Utc>>,
    pub years: Vec<i32>,
    pub nights: usize,
    pub nights_with_bedtime: usize,
    pub nights_with_wake_time: usize,
    pub sleep_events: usize,
    pub resting_heart_rates: usize,
    pub rollups: BTreeMap<Granularity, usize>,
    pub failures: Vec<PeriodFailure>,
}

impl Default for SweepReport {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepReport {
    /// Start a report with a fresh run id
    pub fn new() -> Self {
        Self::with_run_id(Uuid::new_v4().to_string())
    }

    /// Start a report with a specific run id
    pub fn with_run_id(run_id: String) -> Self {
        Self {
            producer: PRODUCER_NAME.to_string(),
            version: ANALYZE_VERSION.to_string(),
            run_id,
            started_at_utc: Utc::now(),
            finished_at_utc: None,
            years: Vec::new(),
            nights: 0,
            nights_with_bedtime: 0,
            nights_with_wake_time: 0,
            sleep_events: 0,
            resting_heart_rates: 0,
            rollups: BTreeMap::new(),
            failures: Vec::new(),
        }
    }

    pub fn record_night(&mut self, classification: &SleepClassification) {
        self.nights += 1;
        self.sleep_events += classification.events.len();
        if classification.markers.bedtime.is_some() {
            self.nights_with_bedtime += 1;
        }
        if classification.markers.wake_time.is_some() {
            self.nights_with_wake_time += 1;
        }
    }

    pub fn record_resting_heart_rate(&mut self) {
        self.resting_heart_rates += 1;
    }

    pub fn record_rollup(&mut self, granularity: Granularity) {
        *self.rollups.entry(granularity).or_insert(0) += 1;
    }

    pub fn rollups(&self, granularity: Granularity) -> usize {
        self.rollups.get(&granularity).copied().unwrap_or(0)
    }

    pub fn record_failure(&mut self, window: &StatWindow, error: &AnalyzeError) {
        self.failures.push(PeriodFailure {
            period: window.to_string(),
            granularity: Some(window.granularity),
            error: error.to_string(),
        });
    }

    pub fn record_year_failure(&mut self, year: i32, error: &AnalyzeError) {
        self.failures.push(PeriodFailure {
            period: format!("year {year}"),
            granularity: None,
            error: error.to_string(),
        });
    }

    pub fn finish(&mut self) {
        self.finished_at_utc = Some(Utc::now());
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn to_json(&self) -> Result<String, AnalyzeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, AnalyzeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Dataset overview for one year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearOverview {
    pub year: i32,
    pub months: Vec<String>,
    pub coverage: DayCoverage,
}
