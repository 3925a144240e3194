//! Period window planning
//!
//! Enumerates the day, week, month and year windows to roll up for one year.
//! Weeks are fixed seven-day strides from January 1st rather than calendar
//! weeks; months follow the calendar.

use crate::error::AnalyzeError;
use crate::types::StatWindow;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Day-of-year of the first day of the last planned week
pub const LAST_WEEK_START_DAY: u32 = 358;

/// Length of a planned week in days
pub const WEEK_STRIDE_DAYS: u32 = 7;

/// All windows to roll up for one year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearPlan {
    pub year: i32,
    pub days: Vec<StatWindow>,
    pub weeks: Vec<StatWindow>,
    pub months: Vec<StatWindow>,
    pub year_window: StatWindow,
}

impl YearPlan {
    /// Every window of the plan in day, week, month, year order
    pub fn windows(&self) -> impl Iterator<Item = &StatWindow> {
        self.days
            .iter()
            .chain(self.weeks.iter())
            .chain(self.months.iter())
            .chain(std::iter::once(&self.year_window))
    }
}

/// Calendar date of a 1-based day of the year
pub fn day_of_year_to_date(year: i32, day: u32) -> Result<NaiveDate, AnalyzeError> {
    NaiveDate::from_yo_opt(year, day)
        .ok_or_else(|| AnalyzeError::InvalidDate(format!("day {day} of year {year}")))
}

/// Number of days in a calendar month
pub fn days_in_month(year: i32, month: u32) -> Result<u32, AnalyzeError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AnalyzeError::InvalidDate(format!("{year}-{month:02}")))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| AnalyzeError::InvalidDate(format!("{year}-{month:02}")))?;
    Ok((next - first).num_days() as u32)
}

/// Planner for day/week/month/year windows
pub struct PeriodWindowPlanner;

impl PeriodWindowPlanner {
    /// Day windows for the observed days of the year
    pub fn day_windows(year: i32, observed_days: &[u32]) -> Result<Vec<StatWindow>, AnalyzeError> {
        observed_days
            .iter()
            .map(|day| day_of_year_to_date(year, *day).map(StatWindow::day))
            .collect()
    }

    /// Week windows starting on days 1, 8, 15, ... 358
    pub fn week_windows(year: i32) -> Result<Vec<StatWindow>, AnalyzeError> {
        (1..=LAST_WEEK_START_DAY)
            .step_by(WEEK_STRIDE_DAYS as usize)
            .map(|day| day_of_year_to_date(year, day).map(StatWindow::week))
            .collect()
    }

    /// One window per calendar month, first to last day
    pub fn month_windows(year: i32) -> Result<Vec<StatWindow>, AnalyzeError> {
        (1..=12)
            .map(|month| {
                let first = NaiveDate::from_ymd_opt(year, month, 1)
                    .ok_or_else(|| AnalyzeError::InvalidDate(format!("{year}-{month:02}")))?;
                let last = first + Duration::days(days_in_month(year, month)? as i64 - 1);
                Ok(StatWindow::month(first, last))
            })
            .collect()
    }

    /// January 1st to December 31st
    pub fn year_window(year: i32) -> Result<StatWindow, AnalyzeError> {
        let first = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| AnalyzeError::InvalidDate(format!("{year}")))?;
        let last = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| AnalyzeError::InvalidDate(format!("{year}")))?;
        Ok(StatWindow::year(first, last))
    }

    pub fn plan(year: i32, observed_days: &[u32]) -> Result<YearPlan, AnalyzeError> {
        Ok(YearPlan {
            year,
            days: Self::day_windows(year, observed_days)?,
            weeks: Self::week_windows(year)?,
            months: Self::month_windows(year)?,
            year_window: Self::year_window(year)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Granularity;
    use chrono::Datelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_february_length() {
        assert_eq!(days_in_month(2024, 2).unwrap(), 29);
        assert_eq!(days_in_month(2023, 2).unwrap(), 28);
        assert_eq!(days_in_month(1900, 2).unwrap(), 28);
        assert_eq!(days_in_month(2000, 2).unwrap(), 29);
        assert_eq!(days_in_month(2023, 12).unwrap(), 31);
    }

    #[test]
    fn test_month_windows_are_calendar_months() {
        let leap = PeriodWindowPlanner::month_windows(2024).unwrap();
        assert_eq!(leap.len(), 12);
        assert_eq!(leap[1].first_day, date(2024, 2, 1));
        assert_eq!(leap[1].last_day, date(2024, 2, 29));
        assert_eq!(leap[11].last_day, date(2024, 12, 31));

        let common = PeriodWindowPlanner::month_windows(2023).unwrap();
        assert_eq!(common[1].last_day, date(2023, 2, 28));
        assert!(common.iter().all(|w| w.granularity == Granularity::Month));
    }

    #[test]
    fn test_week_windows_use_fixed_stride() {
        let weeks = PeriodWindowPlanner::week_windows(2024).unwrap();
        assert_eq!(weeks.len(), 52);
        assert_eq!(weeks[0].first_day, date(2024, 1, 1));
        assert_eq!(weeks[1].first_day, date(2024, 1, 8));
        assert_eq!(weeks[51].first_day.ordinal(), LAST_WEEK_START_DAY);
        assert_eq!(weeks[51].last_day.ordinal(), 364);
        for pair in weeks.windows(2) {
            assert_eq!(pair[0].last_day + Duration::days(1), pair[1].first_day);
        }
    }

    #[test]
    fn test_day_windows_follow_observed_days() {
        let days = PeriodWindowPlanner::day_windows(2024, &[1, 60, 366]).unwrap();
        let firsts: Vec<NaiveDate> = days.iter().map(|w| w.first_day).collect();
        assert_eq!(firsts, vec![date(2024, 1, 1), date(2024, 2, 29), date(2024, 12, 31)]);
    }

    #[test]
    fn test_invalid_day_of_year() {
        assert!(matches!(
            day_of_year_to_date(2023, 366),
            Err(AnalyzeError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_plan_orders_windows() {
        let plan = PeriodWindowPlanner::plan(2023, &[5, 6]).unwrap();
        let windows: Vec<&StatWindow> = plan.windows().collect();
        assert_eq!(windows.len(), 2 + 52 + 12 + 1);
        assert_eq!(windows[0].granularity, Granularity::Day);
        assert_eq!(windows.last().unwrap().granularity, Granularity::Year);
        assert_eq!(plan.year_window.days(), 365);
        assert_eq!(plan.months[2].to_string(), "month 2023-03-01..2023-03-31");
    }
}
