//! Sleep state classification
//!
//! Runs the smoothed intensity of each 60 second tick through a latched state
//! machine, emitting one event per committed state segment, and infers bedtime
//! and wake time from those segments.

use crate::periods::SearchWindow;
use crate::smoother::{IntensitySmoother, DEFAULT_SMOOTHING_FACTOR};
use crate::types::{
    FilteredSample, IntensityPeriod, SleepMarkers, SleepState, SleepStateEvent,
    BASE_AWAKE_INTENSITY,
};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Length of one classification tick
pub const TICK_SECONDS: i64 = 60;

/// Minimum segment length that can set a bedtime or wake marker
pub const MARKER_SEGMENT_SECONDS: i64 = 600;

/// Minimum time between bedtime and wake time
pub const MIN_SLEEP_SECONDS: i64 = 7200;

/// Pure latch transition.
///
/// Returns the state to hold after seeing `candidate` while `state` has been
/// held for `elapsed` seconds, and whether the held state is committed as an
/// event. A different candidate only wins once the held state's latch time has
/// passed; before that it is dropped.
pub fn latch_transition(state: SleepState, candidate: SleepState, elapsed: i64) -> (SleepState, bool) {
    if candidate != state && elapsed >= state.latch_seconds() {
        (candidate, true)
    } else {
        (state, false)
    }
}

/// Latched state machine: the held state and when it was entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatchMachine {
    state: SleepState,
    entered_at: NaiveDateTime,
}

impl LatchMachine {
    pub fn new(state: SleepState, entered_at: NaiveDateTime) -> Self {
        Self { state, entered_at }
    }

    pub fn state(&self) -> SleepState {
        self.state
    }

    pub fn entered_at(&self) -> NaiveDateTime {
        self.entered_at
    }

    /// Observe a candidate state at `at`; returns the event for the state being left
    pub fn observe(&mut self, candidate: SleepState, at: NaiveDateTime) -> Option<SleepStateEvent> {
        let elapsed = (at - self.entered_at).num_seconds();
        let (next, emit) = latch_transition(self.state, candidate, elapsed);
        if !emit {
            return None;
        }
        let event = SleepStateEvent {
            timestamp: self.entered_at,
            state: self.state,
            duration_seconds: elapsed,
        };
        self.state = next;
        self.entered_at = at;
        Some(event)
    }

    /// Close the held state at `end`
    pub fn flush(&self, end: NaiveDateTime) -> SleepStateEvent {
        SleepStateEvent {
            timestamp: self.entered_at,
            state: self.state,
            duration_seconds: (end - self.entered_at).num_seconds().max(0),
        }
    }
}

impl SleepMarkers {
    /// Update the markers from one committed segment.
    ///
    /// The first sleep segment of at least ten minutes sets the bedtime one
    /// second before it starts. After that, the first waking segment of at least
    /// ten minutes starting two or more hours after bedtime sets the wake time
    /// one second after it starts.
    pub fn observe(&mut self, event: &SleepStateEvent) {
        if event.duration_seconds < MARKER_SEGMENT_SECONDS {
            return;
        }
        match (self.bedtime, self.wake_time) {
            (None, _) => {
                if event.state.is_asleep() {
                    self.bedtime = Some(event.timestamp - Duration::seconds(1));
                }
            }
            (Some(bedtime), None) => {
                let slept = (event.timestamp - bedtime).num_seconds();
                if !event.state.is_asleep() && slept >= MIN_SLEEP_SECONDS {
                    self.wake_time = Some(event.timestamp + Duration::seconds(1));
                }
            }
            _ => {}
        }
    }

    pub fn slept(&self) -> bool {
        self.bedtime.is_some()
    }
}

/// Result of classifying one sleep search window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepClassification {
    pub events: Vec<SleepStateEvent>,
    pub markers: SleepMarkers,
}

/// Classifier configuration; all run state lives inside `classify`
#[derive(Debug, Clone, Copy)]
pub struct SleepStateClassifier {
    smoothing_factor: f64,
    initial_intensity: i32,
}

impl Default for SleepStateClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SleepStateClassifier {
    pub fn new() -> Self {
        Self {
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
            initial_intensity: BASE_AWAKE_INTENSITY,
        }
    }

    /// Create a classifier with a specific smoothing factor
    pub fn with_smoothing_factor(smoothing_factor: f64) -> Self {
        Self {
            smoothing_factor,
            ..Self::new()
        }
    }

    /// Smoothed intensity for every tick of every period
    pub fn filter_periods(&self, periods: &[IntensityPeriod]) -> Vec<FilteredSample> {
        let mut filter = IntensitySmoother::new(self.smoothing_factor, self.initial_intensity as f64);
        let mut samples = Vec::new();

        for period in periods {
            for offset in (0..period.duration_seconds.max(0)).step_by(TICK_SECONDS as usize) {
                samples.push(FilteredSample {
                    timestamp: period.start + Duration::seconds(offset),
                    filtered_intensity: filter.advance(period.intensity as f64),
                });
            }
        }

        samples
    }

    /// Classify the periods of one search window
    pub fn classify(&self, periods: &[IntensityPeriod], window: SearchWindow) -> SleepClassification {
        let ticks = self.filter_periods(periods);
        if ticks.is_empty() {
            return SleepClassification::default();
        }

        let mut latch = LatchMachine::new(
            SleepState::for_intensity(self.initial_intensity as i64),
            window.start,
        );
        let mut result = SleepClassification::default();

        for tick in &ticks {
            let candidate = SleepState::for_intensity(tick.filtered_intensity);
            if let Some(event) = latch.observe(candidate, tick.timestamp) {
                debug!(
                    state = event.state.as_str(),
                    at = %event.timestamp,
                    seconds = event.duration_seconds,
                    "sleep state committed"
                );
                result.markers.observe(&event);
                result.events.push(event);
            }
        }

        let end = periods.last().map(IntensityPeriod::end).unwrap_or(window.stop);
        let last = latch.flush(end);
        result.markers.observe(&last);
        result.events.push(last);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn period(start: &str, intensity: i32, end: &str) -> IntensityPeriod {
        IntensityPeriod {
            start: ts(start),
            intensity,
            duration_seconds: (ts(end) - ts(start)).num_seconds(),
        }
    }

    fn window() -> SearchWindow {
        SearchWindow::new(ts("2024-01-15 20:00:00"), ts("2024-01-16 09:00:00"))
    }

    /// Awake until 23:57, three hours of zero intensity, then awake again
    fn night() -> Vec<IntensityPeriod> {
        vec![
            period("2024-01-15 20:00:00", 3, "2024-01-15 23:57:00"),
            period("2024-01-15 23:57:00", 0, "2024-01-16 02:57:00"),
            period("2024-01-16 02:57:00", 3, "2024-01-16 09:00:00"),
        ]
    }

    fn event(start: &str, state: SleepState, seconds: i64) -> SleepStateEvent {
        SleepStateEvent {
            timestamp: ts(start),
            state,
            duration_seconds: seconds,
        }
    }

    #[test]
    fn test_latch_transition() {
        use SleepState::*;
        assert_eq!(latch_transition(Awake, Awake, 1000), (Awake, false));
        assert_eq!(latch_transition(Awake, LightSleep, 59), (Awake, false));
        assert_eq!(latch_transition(Awake, LightSleep, 60), (LightSleep, true));
        assert_eq!(latch_transition(DeepSleep, LightSleep, 299), (DeepSleep, false));
        assert_eq!(latch_transition(DeepSleep, LightSleep, 300), (LightSleep, true));
        assert_eq!(latch_transition(LightSleep, DeepSleep, 120), (DeepSleep, true));
    }

    #[test]
    fn test_latch_drops_short_lived_candidate() {
        let start = ts("2024-01-15 22:00:00");
        let mut latch = LatchMachine::new(SleepState::DeepSleep, start);
        assert!(latch
            .observe(SleepState::Awake, start + Duration::seconds(120))
            .is_none());
        assert_eq!(latch.state(), SleepState::DeepSleep);
        assert_eq!(latch.entered_at(), start);

        let committed = latch
            .observe(SleepState::Active, start + Duration::seconds(300))
            .unwrap();
        assert_eq!(committed, event("2024-01-15 22:00:00", SleepState::DeepSleep, 300));
        assert_eq!(latch.state(), SleepState::Active);
    }

    #[test]
    fn test_bedtime_set_from_first_long_sleep_segment() {
        let mut markers = SleepMarkers::default();
        markers.observe(&event("2024-01-15 23:30:00", SleepState::LightSleep, 599));
        assert_eq!(markers.bedtime, None);

        markers.observe(&event("2024-01-15 23:58:00", SleepState::DeepSleep, 600));
        assert_eq!(markers.bedtime, Some(ts("2024-01-15 23:57:59")));

        markers.observe(&event("2024-01-16 01:00:00", SleepState::LightSleep, 900));
        assert_eq!(markers.bedtime, Some(ts("2024-01-15 23:57:59")));
    }

    #[test]
    fn test_wake_requires_two_hours_after_bedtime() {
        let mut markers = SleepMarkers::default();
        markers.observe(&event("2024-01-15 23:00:00", SleepState::LightSleep, 1200));
        markers.observe(&event("2024-01-16 00:30:00", SleepState::Awake, 900));
        assert_eq!(markers.wake_time, None);

        markers.observe(&event("2024-01-16 06:00:00", SleepState::Active, 600));
        assert_eq!(markers.wake_time, Some(ts("2024-01-16 06:00:01")));

        markers.observe(&event("2024-01-16 07:00:00", SleepState::Awake, 3600));
        assert_eq!(markers.wake_time, Some(ts("2024-01-16 06:00:01")));
    }

    #[test]
    fn test_wake_not_set_without_bedtime() {
        let mut markers = SleepMarkers::default();
        markers.observe(&event("2024-01-16 06:00:00", SleepState::Awake, 7200));
        assert_eq!(markers, SleepMarkers::default());
    }

    #[test]
    fn test_classify_night() {
        let result = SleepStateClassifier::new().classify(&night(), window());

        assert_eq!(
            result.events,
            vec![
                event("2024-01-15 20:00:00", SleepState::Awake, 14280),
                event("2024-01-15 23:58:00", SleepState::LightSleep, 600),
                event("2024-01-16 00:08:00", SleepState::DeepSleep, 10200),
                event("2024-01-16 02:58:00", SleepState::LightSleep, 600),
                event("2024-01-16 03:08:00", SleepState::Awake, 21120),
            ]
        );
        assert_eq!(result.markers.bedtime, Some(ts("2024-01-15 23:57:59")));
        assert_eq!(result.markers.wake_time, Some(ts("2024-01-16 03:08:01")));
    }

    #[test]
    fn test_classify_is_idempotent() {
        let classifier = SleepStateClassifier::new();
        let first = classifier.classify(&night(), window());
        let second = classifier.classify(&night(), window());
        assert_eq!(first, second);
    }

    #[test]
    fn test_latch_invariant_holds() {
        let periods = vec![
            period("2024-01-15 20:00:00", 19, "2024-01-15 20:07:30"),
            period("2024-01-15 20:07:30", 0, "2024-01-15 21:00:00"),
            period("2024-01-15 21:00:00", 12, "2024-01-15 21:02:00"),
            period("2024-01-15 21:02:00", 1, "2024-01-15 23:00:00"),
            period("2024-01-15 23:00:00", 25, "2024-01-15 23:20:00"),
            period("2024-01-15 23:20:00", 0, "2024-01-16 09:00:00"),
        ];
        let result = SleepStateClassifier::new().classify(&periods, window());
        let events = &result.events;
        assert!(events.len() > 2);

        for pair in events.windows(2) {
            assert_ne!(pair[0].state, pair[1].state);
            assert!(pair[0].duration_seconds >= pair[0].state.latch_seconds());
            assert_eq!(
                pair[0].timestamp + Duration::seconds(pair[0].duration_seconds),
                pair[1].timestamp
            );
        }

        let total: i64 = events.iter().map(|e| e.duration_seconds).sum();
        assert_eq!(total, window().duration_seconds());
    }

    #[test]
    fn test_markers_ordered_when_both_set() {
        let result = SleepStateClassifier::new().classify(&night(), window());
        let (bedtime, wake) = (result.markers.bedtime.unwrap(), result.markers.wake_time.unwrap());
        assert!(bedtime < wake);
        assert!((wake - bedtime).num_seconds() >= MIN_SLEEP_SECONDS);
    }

    #[test]
    fn test_empty_window_yields_nothing() {
        let result = SleepStateClassifier::new().classify(&[], window());
        assert!(result.events.is_empty());
        assert_eq!(result.markers, SleepMarkers::default());
    }

    #[test]
    fn test_constantly_active_night_has_no_markers() {
        let periods = vec![period("2024-01-15 20:00:00", 16, "2024-01-16 09:00:00")];
        let result = SleepStateClassifier::new().classify(&periods, window());
        assert!(!result.markers.slept());
        assert_eq!(result.markers.wake_time, None);
        assert!(result.events.iter().all(|e| !e.state.is_asleep()));
    }

    #[test]
    fn test_partial_final_tick_is_processed() {
        let periods = vec![IntensityPeriod {
            start: ts("2024-01-15 20:00:00"),
            intensity: 3,
            duration_seconds: 150,
        }];
        let ticks = SleepStateClassifier::new().filter_periods(&periods);
        let stamps: Vec<NaiveDateTime> = ticks.iter().map(|t| t.timestamp).collect();
        assert_eq!(
            stamps,
            vec![
                ts("2024-01-15 20:00:00"),
                ts("2024-01-15 20:01:00"),
                ts("2024-01-15 20:02:00"),
            ]
        );
    }
}
