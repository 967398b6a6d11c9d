use std::collections::HashMap;
use std::fmt;

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Serialize;

use crate::schedule::DaySlots;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonthRef {
    first: NaiveDate,
}

impl MonthRef {
    pub fn new(year: i32, month: u32) -> anyhow::Result<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| anyhow!("invalid calendar month: {year}-{month:02}"))?;
        Ok(Self { first })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            first: date.with_day(1).unwrap_or(date),
        }
    }

    pub fn year(self) -> i32 {
        self.first.year()
    }

    pub fn month(self) -> u32 {
        self.first.month()
    }

    pub fn first_day(self) -> NaiveDate {
        self.first
    }

    pub fn days_in_month(self) -> u32 {
        let next_first = if self.month() == 12 {
            NaiveDate::from_ymd_opt(self.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year(), self.month() + 1, 1)
        };
        next_first
            .map(|next| (next - self.first).num_days() as u32)
            .unwrap_or(31)
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year() && date.month() == self.month()
    }

    pub fn succ(self) -> Self {
        let (year, month) = if self.month() == 12 {
            (self.year() + 1, 1)
        } else {
            (self.year(), self.month() + 1)
        };
        MonthRef::new(year, month).unwrap_or(self)
    }

    pub fn pred(self) -> Self {
        let (year, month) = if self.month() == 1 {
            (self.year() - 1, 12)
        } else {
            (self.year(), self.month() - 1)
        };
        MonthRef::new(year, month).unwrap_or(self)
    }
}

impl fmt::Display for MonthRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first.format("%Y-%m"))
    }
}

impl std::str::FromStr for MonthRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let re = Regex::new(r"^(?P<year>\d{4})-(?P<month>\d{1,2})$")
            .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;
        let caps = re
            .captures(s.trim())
            .ok_or_else(|| anyhow!("invalid month argument: {s:?} (expected YYYY-MM)"))?;

        let year: i32 = caps
            .name("year")
            .ok_or_else(|| anyhow!("missing year in {s:?}"))?
            .as_str()
            .parse()
            .map_err(|e| anyhow!("invalid year in {s:?}: {e}"))?;
        let month: u32 = caps
            .name("month")
            .ok_or_else(|| anyhow!("missing month in {s:?}"))?
            .as_str()
            .parse()
            .map_err(|e| anyhow!("invalid month in {s:?}: {e}"))?;

        MonthRef::new(year, month)
    }
}

pub type WeekRow = [Option<DaySlots>; 7];

// Monday-first rows; cells before day 1 and after the last day stay None.
pub fn month_grid(month: MonthRef) -> Vec<[Option<NaiveDate>; 7]> {
    let lead = month.first_day().weekday().num_days_from_monday() as usize;
    let days = month.days_in_month() as usize;
    let total_cells = (days + lead).div_ceil(7) * 7;

    let mut rows = Vec::with_capacity(total_cells / 7);
    let mut row: [Option<NaiveDate>; 7] = [None; 7];
    for cell in 0..total_cells {
        let day = cell as i64 - lead as i64 + 1;
        row[cell % 7] = if (1..=days as i64).contains(&day) {
            month.first_day().with_day(day as u32)
        } else {
            None
        };
        if cell % 7 == 6 {
            rows.push(row);
            row = [None; 7];
        }
    }

    rows
}

#[derive(Debug, Clone)]
pub struct CalendarGrid {
    month: MonthRef,
    rows: Vec<WeekRow>,
}

impl CalendarGrid {
    pub fn build(month: MonthRef, days: &[DaySlots]) -> Self {
        let by_date: HashMap<NaiveDate, &DaySlots> =
            days.iter().map(|day| (day.date, day)).collect();

        let rows = month_grid(month)
            .into_iter()
            .map(|row| {
                row.map(|cell| {
                    cell.map(|date| {
                        by_date
                            .get(&date)
                            .map(|day| (*day).clone())
                            .unwrap_or_else(|| DaySlots::open(date))
                    })
                })
            })
            .collect();

        Self { month, rows }
    }

    pub fn month(&self) -> MonthRef {
        self.month
    }

    pub fn rows(&self) -> &[WeekRow] {
        &self.rows
    }

    pub fn week_count(&self) -> usize {
        self.rows.len()
    }

    pub fn week(&self, index: usize) -> anyhow::Result<&WeekRow> {
        self.rows.get(index).ok_or_else(|| {
            anyhow!(
                "week index {index} out of range for {} ({} weeks)",
                self.month,
                self.rows.len()
            )
        })
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DaySlots> {
        self.rows
            .iter()
            .flatten()
            .flatten()
            .find(|day| day.date == date)
    }
}

impl Serialize for MonthRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
