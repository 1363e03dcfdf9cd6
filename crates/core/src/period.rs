//! Monthly periods and timelines.
//!
//! A [`Period`] is the atomic time granularity of the whole system: one calendar
//! month. Records may carry any calendar date; everything downstream of the ledger
//! resamples to periods.

use core::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// One calendar month.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> DomainResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::invalid_period(format!(
                "month must be in 1..=12 (got {month})"
            )));
        }
        // Reject years chrono cannot represent.
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(DomainError::invalid_period(format!(
                "year {year} is out of range"
            )));
        }
        Ok(Self { year, month })
    }

    /// The period containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First calendar day of the month; used as the record date for series values.
    ///
    /// Errors for periods reached by [`offset`](Self::offset) past the calendar range.
    pub fn first_day(&self) -> DomainResult<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).ok_or_else(|| {
            DomainError::invalid_period(format!("{self} is outside the supported calendar range"))
        })
    }

    /// The following month.
    pub fn succ(&self) -> Self {
        self.offset(1)
    }

    /// The preceding month.
    pub fn pred(&self) -> Self {
        self.offset(-1)
    }

    /// Shift by a signed number of months, validating the result.
    pub fn checked_offset(&self, months: i64) -> DomainResult<Self> {
        let shifted = self.offset(months);
        shifted.first_day()?;
        Ok(shifted)
    }

    /// Shift by a signed number of months.
    ///
    /// Plain month arithmetic; the result may lie past the calendar range, which
    /// [`first_day`](Self::first_day) and [`checked_offset`](Self::checked_offset) report.
    pub fn offset(&self, months: i64) -> Self {
        let index = self.ordinal() + months;
        Self {
            year: index.div_euclid(12) as i32,
            month: (index.rem_euclid(12) + 1) as u32,
        }
    }

    /// Signed number of months from `self` to `other`.
    pub fn months_until(&self, other: Period) -> i64 {
        other.ordinal() - self.ordinal()
    }

    fn ordinal(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }
}

impl From<NaiveDate> for Period {
    fn from(value: NaiveDate) -> Self {
        Self::from_date(value)
    }
}

impl core::fmt::Display for Period {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = DomainError;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| DomainError::invalid_period(format!("expected YYYY-MM, got '{s}'")))?;
        let year = year
            .parse::<i32>()
            .map_err(|e| DomainError::invalid_period(format!("year in '{s}': {e}")))?;
        let month = month
            .parse::<u32>()
            .map_err(|e| DomainError::invalid_period(format!("month in '{s}': {e}")))?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for Period {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(value: Period) -> Self {
        value.to_string()
    }
}

/// An ordered, gap-free run of monthly periods.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timeline {
    start: Period,
    months: usize,
}

impl Timeline {
    pub fn new(start: Period, months: usize) -> Self {
        Self { start, months }
    }

    /// Timeline starting at the month containing `start_date`.
    pub fn monthly(start_date: NaiveDate, months: usize) -> Self {
        Self::new(Period::from_date(start_date), months)
    }

    /// Inclusive range `start..=end`.
    pub fn from_range(start: Period, end: Period) -> DomainResult<Self> {
        let span = start.months_until(end);
        if span < 0 {
            return Err(DomainError::invalid_period(format!(
                "timeline end {end} precedes start {start}"
            )));
        }
        Ok(Self::new(start, span as usize + 1))
    }

    pub fn start(&self) -> Period {
        self.start
    }

    /// Last period, or `None` for an empty timeline.
    pub fn end(&self) -> Option<Period> {
        if self.months == 0 {
            None
        } else {
            Some(self.start.offset(self.months as i64 - 1))
        }
    }

    pub fn len(&self) -> usize {
        self.months
    }

    pub fn is_empty(&self) -> bool {
        self.months == 0
    }

    pub fn contains(&self, period: Period) -> bool {
        let idx = self.start.months_until(period);
        idx >= 0 && (idx as usize) < self.months
    }

    pub fn periods(&self) -> impl Iterator<Item = Period> + '_ {
        (0..self.months).map(|i| self.start.offset(i as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(y: i32, m: u32) -> Period {
        Period::new(y, m).unwrap()
    }

    #[test]
    fn offset_crosses_year_boundaries() {
        assert_eq!(p(2024, 12).succ(), p(2025, 1));
        assert_eq!(p(2024, 1).pred(), p(2023, 12));
        assert_eq!(p(2024, 3).offset(-27), p(2021, 12));
        assert_eq!(p(2024, 1).months_until(p(2025, 3)), 14);
    }

    #[test]
    fn rejects_invalid_month() {
        assert!(Period::new(2024, 0).is_err());
        assert!(Period::new(2024, 13).is_err());
        assert!("2024-13".parse::<Period>().is_err());
        assert!("202401".parse::<Period>().is_err());
    }

    #[test]
    fn display_and_parse_agree() {
        let period = p(2024, 7);
        assert_eq!(period.to_string(), "2024-07");
        assert_eq!("2024-07".parse::<Period>().unwrap(), period);
    }

    #[test]
    fn from_date_truncates_to_month() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(Period::from_date(date), p(2024, 2));
        assert_eq!(p(2024, 2).first_day().unwrap(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn periods_past_calendar_range_have_no_first_day() {
        let last = Period::from_date(NaiveDate::MAX);
        assert_eq!(last.first_day().unwrap().year(), NaiveDate::MAX.year());

        let beyond = last.offset(1);
        assert!(matches!(beyond.first_day(), Err(DomainError::InvalidPeriod(_))));
        assert!(last.checked_offset(1).is_err());
        assert_eq!(last.checked_offset(-1).unwrap(), last.pred());

        let timeline = Timeline::new(last, 3);
        let dated: Vec<_> = timeline.periods().map(|p| p.first_day().is_ok()).collect();
        assert_eq!(dated, vec![true, false, false]);
    }

    #[test]
    fn timeline_enumerates_gap_free_periods() {
        let timeline = Timeline::new(p(2024, 11), 4);
        let periods: Vec<_> = timeline.periods().collect();
        assert_eq!(periods, vec![p(2024, 11), p(2024, 12), p(2025, 1), p(2025, 2)]);
        assert_eq!(timeline.end(), Some(p(2025, 2)));
        assert!(timeline.contains(p(2025, 1)));
        assert!(!timeline.contains(p(2025, 3)));
        assert!(!timeline.contains(p(2024, 10)));
    }

    #[test]
    fn timeline_from_range_is_inclusive() {
        let timeline = Timeline::from_range(p(2024, 1), p(2024, 12)).unwrap();
        assert_eq!(timeline.len(), 12);
        assert!(Timeline::from_range(p(2024, 2), p(2024, 1)).is_err());
        assert_eq!(Timeline::new(p(2024, 1), 0).end(), None);
    }

    #[test]
    fn period_serializes_as_string() {
        let json = serde_json::to_string(&p(2030, 5)).unwrap();
        assert_eq!(json, "\"2030-05\"");
        let back: Period = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p(2030, 5));
    }
}
