//! Activity period construction
//!
//! Turns the raw monitoring samples of one sleep search window into a gapless
//! sequence of constant-intensity periods.

use crate::types::{ActivitySample, IntensityPeriod, BASE_AWAKE_INTENSITY};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Time span searched for one night of sleep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchWindow {
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
}

impl SearchWindow {
    pub fn new(start: NaiveDateTime, stop: NaiveDateTime) -> Self {
        Self { start, stop }
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.stop - self.start).num_seconds().max(0)
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts <= self.stop
    }
}

/// Which sample's intensity a period carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodAlignment {
    /// Each period carries the intensity of the next later sample; the last
    /// period before the window stop carries the base awake intensity.
    #[default]
    Lagged,
    /// Each period carries the intensity of the sample that starts it.
    Aligned,
}

/// Builds intensity periods from activity samples
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityPeriodBuilder {
    alignment: PeriodAlignment,
}

impl ActivityPeriodBuilder {
    pub fn new(alignment: PeriodAlignment) -> Self {
        Self { alignment }
    }

    pub fn alignment(&self) -> PeriodAlignment {
        self.alignment
    }

    /// Build periods for `window`, earliest first.
    ///
    /// Samples must be ordered by timestamp; samples outside the window are
    /// ignored. Returns an empty vector when no sample falls inside the window.
    pub fn build(&self, samples: &[ActivitySample], window: SearchWindow) -> Vec<IntensityPeriod> {
        let mut periods = Vec::with_capacity(samples.len() + 1);
        let mut last_sample_ts = window.stop;
        let mut last_intensity = BASE_AWAKE_INTENSITY;

        for sample in samples.iter().rev().filter(|s| window.contains(s.timestamp)) {
            let own_intensity = sample.nominal_intensity();
            let intensity = match self.alignment {
                PeriodAlignment::Lagged => last_intensity,
                PeriodAlignment::Aligned => own_intensity,
            };
            periods.push(IntensityPeriod {
                start: sample.timestamp,
                intensity,
                duration_seconds: (last_sample_ts - sample.timestamp).num_seconds(),
            });
            last_intensity = own_intensity;
            last_sample_ts = sample.timestamp;
        }

        if periods.is_empty() {
            return periods;
        }

        // Cover the stretch between the window start and the earliest sample.
        if last_sample_ts > window.start {
            let intensity = match self.alignment {
                PeriodAlignment::Lagged => last_intensity,
                PeriodAlignment::Aligned => BASE_AWAKE_INTENSITY,
            };
            periods.push(IntensityPeriod {
                start: window.start,
                intensity,
                duration_seconds: (last_sample_ts - window.start).num_seconds(),
            });
        }

        periods.reverse();
        periods
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActivityKind;
    use chrono::Duration;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn window() -> SearchWindow {
        SearchWindow::new(ts("2024-01-15 20:00:00"), ts("2024-01-16 09:00:00"))
    }

    fn samples() -> Vec<ActivitySample> {
        vec![
            ActivitySample::new(ts("2024-01-15 21:00:00"), ActivityKind::Generic, Some(2)),
            ActivitySample::new(ts("2024-01-15 23:00:00"), ActivityKind::StopDisable, None),
            ActivitySample::new(ts("2024-01-16 06:30:00"), ActivityKind::Walking, Some(4)),
        ]
    }

    fn assert_partitions(periods: &[IntensityPeriod], window: SearchWindow) {
        assert_eq!(periods.first().unwrap().start, window.start);
        assert_eq!(periods.last().unwrap().end(), window.stop);
        for pair in periods.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start);
        }
        let total: i64 = periods.iter().map(|p| p.duration_seconds).sum();
        assert_eq!(total, window.duration_seconds());
    }

    #[test]
    fn test_periods_partition_window() {
        let periods = ActivityPeriodBuilder::default().build(&samples(), window());
        assert_eq!(periods.len(), 4);
        assert_partitions(&periods, window());
    }

    #[test]
    fn test_lagged_alignment_uses_next_sample_intensity() {
        let periods = ActivityPeriodBuilder::new(PeriodAlignment::Lagged).build(&samples(), window());
        let intensities: Vec<i32> = periods.iter().map(|p| p.intensity).collect();
        // pad carries the first sample (10 + 2*2), each sample carries its successor,
        // and the last sample carries the base awake value.
        assert_eq!(intensities, vec![14, 0, 18, BASE_AWAKE_INTENSITY]);
    }

    #[test]
    fn test_aligned_alignment_uses_own_sample_intensity() {
        let periods = ActivityPeriodBuilder::new(PeriodAlignment::Aligned).build(&samples(), window());
        let intensities: Vec<i32> = periods.iter().map(|p| p.intensity).collect();
        assert_eq!(intensities, vec![BASE_AWAKE_INTENSITY, 14, 0, 18]);
        assert_partitions(&periods, window());
    }

    #[test]
    fn test_sample_at_window_start_needs_no_pad() {
        let window = window();
        let samples = vec![
            ActivitySample::new(window.start, ActivityKind::StopDisable, Some(0)),
            ActivitySample::new(window.start + Duration::hours(5), ActivityKind::Generic, None),
        ];
        let periods = ActivityPeriodBuilder::default().build(&samples, window);
        assert_eq!(periods.len(), 2);
        assert_partitions(&periods, window);
    }

    #[test]
    fn test_samples_outside_window_are_ignored() {
        let window = window();
        let mut input = vec![ActivitySample::new(
            ts("2024-01-15 12:00:00"),
            ActivityKind::Generic,
            Some(9),
        )];
        input.extend(samples());
        input.push(ActivitySample::new(ts("2024-01-16 12:00:00"), ActivityKind::Generic, None));

        let periods = ActivityPeriodBuilder::default().build(&input, window);
        assert_eq!(periods.len(), 4);
        assert_partitions(&periods, window);
    }

    #[test]
    fn test_empty_samples_produce_no_periods() {
        assert!(ActivityPeriodBuilder::default().build(&[], window()).is_empty());
    }
}
