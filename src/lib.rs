//! Garmin Analyze - sleep classification and period rollups for monitoring data
//!
//! Analyze turns raw activity monitoring samples into nightly sleep events and
//! rolls provider statistics up into day, week, month and year summaries:
//! search window → intensity periods → smoothing → latched sleep states →
//! bedtime/wake markers → storage, followed by the period rollups.
//!
//! ## Modules
//!
//! - **Sleep**: `periods`, `smoother` and `classifier` build one night of sleep events
//! - **Rollups**: `planner`, `rollup` and `gaps` cover every period of a year
//! - **Storage**: the `MonitoringStore` contract and an in-memory implementation

pub mod classifier;
pub mod config;
pub mod error;
pub mod gaps;
pub mod periods;
pub mod pipeline;
pub mod planner;
pub mod report;
pub mod rollup;
pub mod smoother;
pub mod store;
pub mod types;

pub use classifier::{SleepClassification, SleepStateClassifier};
pub use config::{AnalyzeConfig, SleepPeriod};
pub use error::AnalyzeError;
pub use periods::{ActivityPeriodBuilder, PeriodAlignment, SearchWindow};
pub use pipeline::{dataset_overview, set_sleep_period, Analyzer};
pub use report::{SweepReport, YearOverview};
pub use rollup::{MetricSource, RollupAggregator};
pub use store::{MemoryStore, MonitoringStore};

/// Version embedded in every run report
pub const ANALYZE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for run reports
pub const PRODUCER_NAME: &str = "garmin-analyze";
