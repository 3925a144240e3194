//! Core types for the Garmin Analyze pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw activity samples, intensity periods, sleep states and events,
//! and the statistic mappings that make up period rollups.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Nominal intensity of a person who is awake but not moving
pub const BASE_AWAKE_INTENSITY: i32 = 3;

/// Nominal intensity of any sample recorded while the device was tracking activity
pub const BASE_ACTIVE_INTENSITY: i32 = 10;

/// Activity kind reported by the device for a monitoring sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Generic,
    StopDisable,
    Sedentary,
    Walking,
    Running,
    Cycling,
    Swimming,
    #[serde(other)]
    Unknown,
}

/// A single raw activity monitoring sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySample {
    /// Local time the sample was recorded
    pub timestamp: NaiveDateTime,
    /// Kind of activity the device was tracking
    pub activity_kind: ActivityKind,
    /// Raw intensity reported by the device, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<u32>,
}

impl ActivitySample {
    pub fn new(timestamp: NaiveDateTime, activity_kind: ActivityKind, intensity: Option<u32>) -> Self {
        Self {
            timestamp,
            activity_kind,
            intensity,
        }
    }

    /// Nominal intensity of this sample.
    ///
    /// A `stop_disable` sample means the device stopped tracking activity, so the
    /// raw intensity is taken as-is (absent reads as zero). Every other kind sits on
    /// top of the base active intensity, with each raw step counting double.
    pub fn nominal_intensity(&self) -> i32 {
        let raw = self.intensity.map(|i| i.min(i32::MAX as u32) as i32);
        match self.activity_kind {
            ActivityKind::StopDisable => raw.unwrap_or(0),
            _ => match raw {
                Some(raw) => BASE_ACTIVE_INTENSITY.saturating_add(raw.saturating_mul(2)),
                None => BASE_ACTIVE_INTENSITY,
            },
        }
    }
}

/// A contiguous span with one nominal intensity value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntensityPeriod {
    pub start: NaiveDateTime,
    pub intensity: i32,
    pub duration_seconds: i64,
}

impl IntensityPeriod {
    /// Exclusive end of the period
    pub fn end(&self) -> NaiveDateTime {
        self.start + Duration::seconds(self.duration_seconds)
    }
}

/// Output of the moving-average filter for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredSample {
    pub timestamp: NaiveDateTime,
    pub filtered_intensity: i64,
}

/// Sleep/activity state derived from filtered intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepState {
    DeepSleep,
    LightSleep,
    Awake,
    Active,
    ModeratelyActive,
    VeryActive,
    ExtremelyActive,
}

impl SleepState {
    pub const ALL: [SleepState; 7] = [
        SleepState::DeepSleep,
        SleepState::LightSleep,
        SleepState::Awake,
        SleepState::Active,
        SleepState::ModeratelyActive,
        SleepState::VeryActive,
        SleepState::ExtremelyActive,
    ];

    /// Ordinal from 0 (deep sleep) to 6 (extremely active)
    pub fn index(&self) -> u8 {
        match self {
            SleepState::DeepSleep => 0,
            SleepState::LightSleep => 1,
            SleepState::Awake => 2,
            SleepState::Active => 3,
            SleepState::ModeratelyActive => 4,
            SleepState::VeryActive => 5,
            SleepState::ExtremelyActive => 6,
        }
    }

    /// Minimum time in seconds the state must be held before it can be left
    pub fn latch_seconds(&self) -> i64 {
        match self {
            SleepState::DeepSleep => 300,
            SleepState::LightSleep => 120,
            _ => 60,
        }
    }

    /// Look up the state for a filtered intensity.
    ///
    /// The table is defined for 0..=19; values outside it are clamped to the
    /// nearest bucket.
    pub fn for_intensity(intensity: i64) -> SleepState {
        match intensity.clamp(0, 19) {
            0 => SleepState::DeepSleep,
            1..=2 => SleepState::LightSleep,
            3..=8 => SleepState::Awake,
            9..=11 => SleepState::Active,
            12..=14 => SleepState::ModeratelyActive,
            15..=17 => SleepState::VeryActive,
            _ => SleepState::ExtremelyActive,
        }
    }

    pub fn is_asleep(&self) -> bool {
        self.index() <= 1
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SleepState::DeepSleep => "deep_sleep",
            SleepState::LightSleep => "light_sleep",
            SleepState::Awake => "awake",
            SleepState::Active => "active",
            SleepState::ModeratelyActive => "moderately_active",
            SleepState::VeryActive => "very_active",
            SleepState::ExtremelyActive => "extremely_active",
        }
    }
}

/// A latched classification segment emitted by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepStateEvent {
    /// When the state was entered
    pub timestamp: NaiveDateTime,
    pub state: SleepState,
    /// How long the state was held
    pub duration_seconds: i64,
}

/// Bedtime and wake time inferred for one night
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepMarkers {
    pub bedtime: Option<NaiveDateTime>,
    pub wake_time: Option<NaiveDateTime>,
}

/// Label of a persisted sleep event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepEventLabel {
    DeepSleep,
    LightSleep,
    Awake,
    Active,
    ModeratelyActive,
    VeryActive,
    ExtremelyActive,
    BedTime,
    WakeTime,
}

impl From<SleepState> for SleepEventLabel {
    fn from(state: SleepState) -> Self {
        match state {
            SleepState::DeepSleep => SleepEventLabel::DeepSleep,
            SleepState::LightSleep => SleepEventLabel::LightSleep,
            SleepState::Awake => SleepEventLabel::Awake,
            SleepState::Active => SleepEventLabel::Active,
            SleepState::ModeratelyActive => SleepEventLabel::ModeratelyActive,
            SleepState::VeryActive => SleepEventLabel::VeryActive,
            SleepState::ExtremelyActive => SleepEventLabel::ExtremelyActive,
        }
    }
}

/// Sleep log entry handed to storage, upserted by timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepRecord {
    pub timestamp: NaiveDateTime,
    pub event: SleepEventLabel,
    pub duration: i64,
}

impl From<&SleepStateEvent> for SleepRecord {
    fn from(event: &SleepStateEvent) -> Self {
        Self {
            timestamp: event.timestamp,
            event: event.state.into(),
            duration: event.duration_seconds,
        }
    }
}

/// Resting heart rate for one day, upserted by day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RestingHeartRateRecord {
    pub day: NaiveDate,
    pub resting_heart_rate: f64,
}

/// Unit system used by unit-aware metric providers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    #[default]
    Metric,
    Statute,
}

impl UnitSystem {
    /// Parse the stored `units` attribute
    pub fn from_attribute(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "english" | "statute" | "imperial" => UnitSystem::Statute,
            _ => UnitSystem::Metric,
        }
    }

    pub fn is_alternate(&self) -> bool {
        matches!(self, UnitSystem::Statute)
    }
}

/// Rollup granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Year,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }
}

/// A period window: its granularity plus the inclusive first and last day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatWindow {
    pub granularity: Granularity,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
}

impl StatWindow {
    pub fn day(day: NaiveDate) -> Self {
        Self {
            granularity: Granularity::Day,
            first_day: day,
            last_day: day,
        }
    }

    pub fn week(first_day: NaiveDate) -> Self {
        Self {
            granularity: Granularity::Week,
            first_day,
            last_day: first_day + Duration::days(6),
        }
    }

    pub fn month(first_day: NaiveDate, last_day: NaiveDate) -> Self {
        Self {
            granularity: Granularity::Month,
            first_day,
            last_day,
        }
    }

    pub fn year(first_day: NaiveDate, last_day: NaiveDate) -> Self {
        Self {
            granularity: Granularity::Year,
            first_day,
            last_day,
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.first_day && day <= self.last_day
    }

    /// Number of days covered, inclusive
    pub fn days(&self) -> i64 {
        (self.last_day - self.first_day).num_days() + 1
    }
}

impl fmt::Display for StatWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first_day == self.last_day {
            write!(f, "{} {}", self.granularity.as_str(), self.first_day)
        } else {
            write!(
                f,
                "{} {}..{}",
                self.granularity.as_str(),
                self.first_day,
                self.last_day
            )
        }
    }
}

/// Metric name to scalar value, as returned by one provider
pub type StatMap = BTreeMap<String, f64>;

/// Merged statistics for one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatBundle {
    pub window: StatWindow,
    pub stats: StatMap,
}

impl StatBundle {
    pub fn new(window: StatWindow) -> Self {
        Self {
            window,
            stats: StatMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

/// Persisted form of a stat bundle, upserted by (first day, granularity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub granularity: Granularity,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub stats: StatMap,
}

impl From<StatBundle> for SummaryRecord {
    fn from(bundle: StatBundle) -> Self {
        Self {
            granularity: bundle.window.granularity,
            first_day: bundle.window.first_day,
            last_day: bundle.window.last_day,
            stats: bundle.stats,
        }
    }
}
