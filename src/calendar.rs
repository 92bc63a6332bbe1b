//! Month layouts and the days-with-data index over an `AggregateIndex`.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::aggregate::AggregateIndex;
use crate::error::CalendarError;
use crate::record::DateKey;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Sunday-first weekday header.
pub const WEEKDAY_INITIALS: [char; 7] = ['S', 'M', 'T', 'W', 'T', 'F', 'S'];

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, CalendarError> {
    if month > 11 {
        return Err(CalendarError::InvalidMonth(month));
    }
    NaiveDate::from_ymd_opt(year, month + 1, 1).ok_or(CalendarError::InvalidYear(year))
}

/// Number of days in a 0-based month, leap years included.
pub fn days_in_month(year: i32, month: u32) -> Result<u32, CalendarError> {
    let first = first_of_month(year, month)?;
    let next = if month == 11 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 2, 1)
    };
    match next {
        Some(next) => Ok(next.signed_duration_since(first).num_days() as u32),
        // December of the last representable year.
        None => Ok(31),
    }
}

/// Weekday of the 1st, 0 = Sunday .. 6 = Saturday.
pub fn first_weekday(year: i32, month: u32) -> Result<u32, CalendarError> {
    Ok(first_of_month(year, month)?.weekday().num_days_from_sunday())
}

/// Days of the month (1-based) that have aggregated data.
pub fn days_with_data(
    index: &AggregateIndex,
    year: i32,
    month: u32,
) -> Result<BTreeSet<u32>, CalendarError> {
    let n = days_in_month(year, month)?;
    Ok((1..=n)
        .filter(|&day| {
            DateKey::from_calendar(year, month, day)
                .map(|k| index.contains(&k))
                .unwrap_or(false)
        })
        .collect())
}

/// Everything needed to draw one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthLayout {
    pub year: i32,
    /// 0-based.
    pub month: u32,
    pub name: &'static str,
    pub days_in_month: u32,
    pub first_weekday: u32,
    pub flagged: BTreeSet<u32>,
}

impl MonthLayout {
    pub fn build(index: &AggregateIndex, year: i32, month: u32) -> Result<Self, CalendarError> {
        Ok(Self {
            year,
            month,
            name: MONTH_NAMES[month.min(11) as usize],
            days_in_month: days_in_month(year, month)?,
            first_weekday: first_weekday(year, month)?,
            flagged: days_with_data(index, year, month)?,
        })
    }

    pub fn title(&self) -> String {
        format!("{} {}", self.name, self.year)
    }

    pub fn is_flagged(&self, day: u32) -> bool {
        self.flagged.contains(&day)
    }

    /// Rows of seven cells; `None` pads before day 1 and after the last day.
    pub fn weeks(&self) -> Vec<[Option<u32>; 7]> {
        let mut weeks = Vec::new();
        let mut week = [None; 7];
        let mut col = self.first_weekday as usize;
        for day in 1..=self.days_in_month {
            week[col] = Some(day);
            col += 1;
            if col == 7 {
                weeks.push(week);
                week = [None; 7];
                col = 0;
            }
        }
        if col > 0 {
            weeks.push(week);
        }
        weeks
    }

    /// Row and column of a day within `weeks()`.
    pub fn cell_of(&self, day: u32) -> Option<(usize, usize)> {
        if day == 0 || day > self.days_in_month {
            return None;
        }
        let offset = self.first_weekday as usize + day as usize - 1;
        Some((offset / 7, offset % 7))
    }
}

/// All twelve months of a year; what the calendar shows when no month is selected.
pub fn year_layouts(index: &AggregateIndex, year: i32) -> Result<Vec<MonthLayout>, CalendarError> {
    (0..12).map(|m| MonthLayout::build(index, year, m)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::record::LogRecord;

    fn index_with(days: &[&str]) -> AggregateIndex {
        let mut agg = Aggregator::new();
        agg.merge_records(
            days.iter()
                .map(|d| LogRecord::new("R1", "E1", DateKey::parse(d).unwrap())),
        );
        agg.index().clone()
    }

    #[test]
    fn month_lengths_follow_leap_rules() {
        assert_eq!(days_in_month(2024, 1).unwrap(), 29);
        assert_eq!(days_in_month(2023, 1).unwrap(), 28);
        assert_eq!(days_in_month(1900, 1).unwrap(), 28);
        assert_eq!(days_in_month(2000, 1).unwrap(), 29);
        assert_eq!(days_in_month(2024, 11).unwrap(), 31);
        assert_eq!(days_in_month(2024, 3).unwrap(), 30);
    }

    #[test]
    fn first_weekday_is_sunday_based() {
        // 2024-09-01 was a Sunday, 2024-03-01 a Friday.
        assert_eq!(first_weekday(2024, 8).unwrap(), 0);
        assert_eq!(first_weekday(2024, 2).unwrap(), 5);
    }

    #[test]
    fn rejects_bad_month() {
        assert_eq!(days_in_month(2024, 12), Err(CalendarError::InvalidMonth(12)));
        assert!(MonthLayout::build(&AggregateIndex::default(), 2024, 12).is_err());
    }

    #[test]
    fn flags_only_days_in_the_requested_month() {
        let index = index_with(&["2024-02-01", "2024-02-29", "2024-03-01", "2023-02-01"]);
        let days = days_with_data(&index, 2024, 1).unwrap();
        assert_eq!(days.into_iter().collect::<Vec<_>>(), vec![1, 29]);
    }

    #[test]
    fn weeks_cover_every_day_once() {
        let layout = MonthLayout::build(&AggregateIndex::default(), 2024, 2).unwrap();
        let weeks = layout.weeks();
        let days: Vec<u32> = weeks.iter().flatten().flatten().copied().collect();
        assert_eq!(days, (1..=31).collect::<Vec<_>>());
        assert_eq!(weeks[0][5], Some(1));
        assert_eq!(layout.cell_of(1), Some((0, 5)));
        assert_eq!(layout.cell_of(3), Some((1, 0)));
        assert_eq!(layout.cell_of(32), None);
    }

    #[test]
    fn year_view_has_twelve_months() {
        let index = index_with(&["2024-07-04"]);
        let months = year_layouts(&index, 2024).unwrap();
        assert_eq!(months.len(), 12);
        assert_eq!(months[6].title(), "July 2024");
        assert!(months[6].is_flagged(4));
        assert!(months.iter().enumerate().all(|(m, l)| m == 6 || l.flagged.is_empty()));
    }
}
