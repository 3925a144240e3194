//! Day gap detection
//!
//! Advisory pass over the observed days of a year that reports every place
//! where consecutive observed days are not adjacent.

use crate::error::AnalyzeError;
use crate::planner::day_of_year_to_date;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Missing stretch between two observed days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayGap {
    pub day: u32,
    pub next_day: u32,
    pub date: NaiveDate,
    pub next_date: NaiveDate,
}

impl DayGap {
    /// Number of unobserved days inside the gap
    pub fn missing_days(&self) -> u32 {
        self.next_day.saturating_sub(self.day).saturating_sub(1)
    }
}

/// Observed day coverage of one year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCoverage {
    pub year: i32,
    pub days: usize,
    /// Days from the first to the last observed day, inclusive
    pub span: u32,
    pub gaps: Vec<DayGap>,
}

pub struct GapDetector;

impl GapDetector {
    /// Gaps between adjacent entries of `days`, which must be sorted
    pub fn detect(year: i32, days: &[u32]) -> Result<Vec<DayGap>, AnalyzeError> {
        days.windows(2)
            .filter(|pair| pair[1] != pair[0] + 1)
            .map(|pair| {
                Ok(DayGap {
                    day: pair[0],
                    next_day: pair[1],
                    date: day_of_year_to_date(year, pair[0])?,
                    next_date: day_of_year_to_date(year, pair[1])?,
                })
            })
            .collect()
    }

    pub fn coverage(year: i32, days: &[u32]) -> Result<DayCoverage, AnalyzeError> {
        let span = match (days.first(), days.last()) {
            (Some(first), Some(last)) => last - first + 1,
            _ => 0,
        };
        Ok(DayCoverage {
            year,
            days: days.len(),
            span,
            gaps: Self::detect(year, days)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_gap() {
        let gaps = GapDetector::detect(2024, &[1, 2, 3, 10, 11]).unwrap();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].day, 3);
        assert_eq!(gaps[0].next_day, 10);
        assert_eq!(gaps[0].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(gaps[0].next_date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(gaps[0].missing_days(), 6);
    }

    #[test]
    fn test_contiguous_and_short_inputs() {
        assert!(GapDetector::detect(2024, &[4, 5, 6, 7]).unwrap().is_empty());
        assert!(GapDetector::detect(2024, &[4]).unwrap().is_empty());
        assert!(GapDetector::detect(2024, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_coverage_span() {
        let coverage = GapDetector::coverage(2023, &[1, 2, 3, 10, 11]).unwrap();
        assert_eq!(coverage.days, 5);
        assert_eq!(coverage.span, 11);
        assert_eq!(coverage.gaps.len(), 1);

        let empty = GapDetector::coverage(2023, &[]).unwrap();
        assert_eq!(empty.span, 0);
    }
}
