//! Pipeline orchestration
//!
//! Drives the whole analysis over a monitoring store: nightly sleep
//! classification, resting heart rate, and the day/week/month/year rollups.
//!
//! Pipeline stages for one night:
//! 1. SleepPeriod - Search window around the configured sleep period
//! 2. ActivityPeriodBuilder - Samples to constant-intensity periods
//! 3. SleepStateClassifier - Smoothed intensity to latched sleep states
//! 4. MonitoringStore - Upsert sleep events and bedtime/wake markers

use crate::classifier::{SleepClassification, SleepStateClassifier};
use crate::config::{AnalyzeConfig, SleepPeriod};
use crate::error::AnalyzeError;
use crate::gaps::GapDetector;
use crate::periods::{ActivityPeriodBuilder, PeriodAlignment};
use crate::planner::PeriodWindowPlanner;
use crate::report::{SweepReport, YearOverview};
use crate::rollup::RollupAggregator;
use crate::store::MonitoringStore;
use crate::types::{
    Granularity, RestingHeartRateRecord, SleepEventLabel, SleepRecord, StatBundle, StatWindow,
    SummaryRecord,
};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

/// Overview counter holding the number of years with data
pub const OVERVIEW_YEARS_KEY: &str = "years";

/// Duration stored with bedtime and wake time marker records
const MARKER_RECORD_SECONDS: i64 = 1;

/// Store the nightly sleep window
pub fn set_sleep_period(
    store: &mut dyn MonitoringStore,
    period: SleepPeriod,
) -> Result<(), AnalyzeError> {
    period.save(store)?;
    info!(start = %period.start, stop = %period.stop, "sleep period set");
    Ok(())
}

/// Count the years, months and days with data and log every day gap.
///
/// Writes `years`, `<year>_months`, `<year>_days` and `<year>_days_span`
/// overview counters.
pub fn dataset_overview(store: &mut dyn MonitoringStore) -> Result<Vec<YearOverview>, AnalyzeError> {
    let years = store.get_years()?;
    store.set_summary_value(OVERVIEW_YEARS_KEY, years.len() as i64)?;
    info!(years = years.len(), "dataset overview");

    let mut overview = Vec::with_capacity(years.len());
    for year in years {
        let months = store.get_month_names(year)?;
        store.set_summary_value(&format!("{year}_months"), months.len() as i64)?;
        info!(year, months = %months.join(", "), "months with data");

        let days = store.get_days(year)?;
        let coverage = GapDetector::coverage(year, &days)?;
        store.set_summary_value(&format!("{year}_days"), coverage.days as i64)?;
        store.set_summary_value(&format!("{year}_days_span"), coverage.span as i64)?;
        info!(year, days = coverage.days, span = coverage.span, "days with data");

        for gap in &coverage.gaps {
            info!(
                year,
                from = %gap.date,
                to = %gap.next_date,
                missing = gap.missing_days(),
                "gap in daily data"
            );
        }

        overview.push(YearOverview {
            year,
            months,
            coverage,
        });
    }

    Ok(overview)
}

/// Stateful analyzer bound to one store and one configuration.
///
/// Every write is an upsert, so running the analyzer twice over the same data
/// leaves the store unchanged the second time.
pub struct Analyzer<'s> {
    store: &'s mut dyn MonitoringStore,
    config: AnalyzeConfig,
    builder: ActivityPeriodBuilder,
    classifier: SleepStateClassifier,
}

impl<'s> Analyzer<'s> {
    /// Create an analyzer from the configuration held in the store.
    ///
    /// Fails with `MissingAttribute` when no sleep period has been set.
    pub fn new(
        store: &'s mut dyn MonitoringStore,
        alignment: PeriodAlignment,
    ) -> Result<Self, AnalyzeError> {
        let config = AnalyzeConfig::from_store(&*store, alignment)?;
        Ok(Self::with_config(store, config))
    }

    /// Create an analyzer with an explicit configuration
    pub fn with_config(store: &'s mut dyn MonitoringStore, config: AnalyzeConfig) -> Self {
        Self {
            store,
            config,
            builder: ActivityPeriodBuilder::new(config.alignment),
            classifier: SleepStateClassifier::new(),
        }
    }

    /// Replace the sleep state classifier
    pub fn with_classifier(mut self, classifier: SleepStateClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &AnalyzeConfig {
        &self.config
    }

    /// Classify the night starting on `day` without writing anything
    pub fn classify_night(&self, day: NaiveDate) -> Result<SleepClassification, AnalyzeError> {
        let window = self.config.sleep_period.search_window(day);
        let samples = self.store.get_activity(window.start, window.stop)?;
        let periods = self.builder.build(&samples, window);
        debug!(%day, samples = samples.len(), periods = periods.len(), "night periods built");
        Ok(self.classifier.classify(&periods, window))
    }

    /// Classify the night starting on `day` and persist its events and markers
    pub fn calculate_sleep(&mut self, day: NaiveDate) -> Result<SleepClassification, AnalyzeError> {
        let classification = self.classify_night(day)?;

        for event in &classification.events {
            self.store.upsert_sleep_record(SleepRecord::from(event))?;
        }
        if let Some(bedtime) = classification.markers.bedtime {
            self.store.upsert_sleep_record(SleepRecord {
                timestamp: bedtime,
                event: SleepEventLabel::BedTime,
                duration: MARKER_RECORD_SECONDS,
            })?;
        }
        if let Some(wake_time) = classification.markers.wake_time {
            self.store.upsert_sleep_record(SleepRecord {
                timestamp: wake_time,
                event: SleepEventLabel::WakeTime,
                duration: MARKER_RECORD_SECONDS,
            })?;
        }

        info!(
            %day,
            events = classification.events.len(),
            bedtime = ?classification.markers.bedtime,
            wake_time = ?classification.markers.wake_time,
            "sleep calculated"
        );
        Ok(classification)
    }

    /// Look up and persist the resting heart rate for `day`
    pub fn calculate_resting_heart_rate(&mut self, day: NaiveDate) -> Result<Option<f64>, AnalyzeError> {
        let from = self.config.sleep_period.resting_heart_rate_from(day);
        let resting = self.store.get_resting_heart_rate(from)?;
        match resting {
            Some(resting_heart_rate) => {
                self.store.upsert_resting_heart_rate(RestingHeartRateRecord {
                    day,
                    resting_heart_rate,
                })?;
                debug!(%day, resting_heart_rate, "resting heart rate stored");
            }
            None => debug!(%day, "no resting heart rate"),
        }
        Ok(resting)
    }

    /// Roll up every provider for `window` and persist the summary
    pub fn calculate_stats(&mut self, window: StatWindow) -> Result<StatBundle, AnalyzeError> {
        let bundle = RollupAggregator::collect(&*self.store, window, self.config.units)?;
        self.store.upsert_summary(SummaryRecord::from(bundle.clone()))?;
        debug!(%window, keys = bundle.stats.len(), "summary stored");
        Ok(bundle)
    }

    /// Sleep, resting heart rate and day rollup for one observed day
    fn calculate_day(
        &mut self,
        window: StatWindow,
        report: &mut SweepReport,
    ) -> Result<(), AnalyzeError> {
        let classification = self.calculate_sleep(window.first_day)?;
        report.record_night(&classification);
        if self.calculate_resting_heart_rate(window.first_day)?.is_some() {
            report.record_resting_heart_rate();
        }
        self.calculate_stats(window)?;
        report.record_rollup(Granularity::Day);
        Ok(())
    }

    /// Process every observed day of `year`, then its weeks, months and the year.
    ///
    /// A period that fails is logged and recorded in `report`; the remaining
    /// periods are still processed.
    pub fn summarize_year(&mut self, year: i32, report: &mut SweepReport) -> Result<(), AnalyzeError> {
        let days = self.store.get_days(year)?;
        let plan = PeriodWindowPlanner::plan(year, &days)?;
        info!(year, days = plan.days.len(), "summarizing year");

        for window in plan.windows() {
            let result = match window.granularity {
                Granularity::Day => self.calculate_day(*window, report),
                granularity => self
                    .calculate_stats(*window)
                    .map(|_| report.record_rollup(granularity)),
            };
            if let Err(e) = result {
                warn!(%window, error = %e, "period failed");
                report.record_failure(window, &e);
            }
        }

        Ok(())
    }

    /// Full sweep over every year in the store
    pub fn summary(&mut self) -> Result<SweepReport, AnalyzeError> {
        let mut report = SweepReport::new();
        report.years = self.store.get_years()?;
        info!(run_id = %report.run_id, years = ?report.years, "summary started");

        for year in report.years.clone() {
            if let Err(e) = self.summarize_year(year, &mut report) {
                warn!(year, error = %e, "year failed");
                report.record_year_failure(year, &e);
            }
        }

        report.finish();
        info!(
            nights = report.nights,
            failures = report.failures.len(),
            "summary finished"
        );
        Ok(report)
    }
}
