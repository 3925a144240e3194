//! Period rollups
//!
//! Merges the partial statistic mappings returned by each metric provider into
//! one bundle per period. Providers are applied in a fixed order and later
//! providers overwrite keys already set by earlier ones.

use crate::error::AnalyzeError;
use crate::store::MonitoringStore;
use crate::types::{StatBundle, StatMap, StatWindow, UnitSystem};
use serde::{Deserialize, Serialize};

/// Metric provider queried for period statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSource {
    HeartRate,
    RestingHeartRate,
    Weight,
    Stress,
    /// Floors and ascent; the only unit-aware provider
    Climb,
    IntensityMinutes,
    /// Steps and other monitoring counters
    Monitoring,
}

impl MetricSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricSource::HeartRate => "heart_rate",
            MetricSource::RestingHeartRate => "resting_heart_rate",
            MetricSource::Weight => "weight",
            MetricSource::Stress => "stress",
            MetricSource::Climb => "climb",
            MetricSource::IntensityMinutes => "intensity_minutes",
            MetricSource::Monitoring => "monitoring",
        }
    }

    pub fn is_unit_aware(&self) -> bool {
        matches!(self, MetricSource::Climb)
    }
}

/// Order in which providers are merged; a key set by a later provider wins
pub const ROLLUP_ORDER: [MetricSource; 7] = [
    MetricSource::HeartRate,
    MetricSource::RestingHeartRate,
    MetricSource::Weight,
    MetricSource::Stress,
    MetricSource::Climb,
    MetricSource::IntensityMinutes,
    MetricSource::Monitoring,
];

/// Merges provider results into period bundles
pub struct RollupAggregator;

impl RollupAggregator {
    /// Fold provider mappings left to right into one bundle
    pub fn merge<I>(window: StatWindow, partials: I) -> StatBundle
    where
        I: IntoIterator<Item = StatMap>,
    {
        let mut bundle = StatBundle::new(window);
        for partial in partials {
            bundle.stats.extend(partial);
        }
        bundle
    }

    /// Query every provider in `ROLLUP_ORDER` for `window` and merge the results.
    ///
    /// Only unit-aware providers see `units`; the others are always queried metric.
    pub fn collect(
        store: &dyn MonitoringStore,
        window: StatWindow,
        units: UnitSystem,
    ) -> Result<StatBundle, AnalyzeError> {
        let partials = ROLLUP_ORDER
            .iter()
            .map(|source| {
                let units = if source.is_unit_aware() {
                    units
                } else {
                    UnitSystem::Metric
                };
                store.get_stats(*source, &window, units)
            })
            .collect::<Result<Vec<StatMap>, AnalyzeError>>()?;

        Ok(Self::merge(window, partials))
    }
}
