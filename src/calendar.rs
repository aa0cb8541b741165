use chrono::{Datelike, Days, NaiveDate, Weekday};
use derive_more::Display;
use std::fmt;

use crate::error::{Error, ErrorKind, Result};

/// Column headers of the month grid, Monday first.
pub const WEEKDAY_LABELS: [&str; 7] = ["一", "二", "三", "四", "五", "六", "日"];

/// A local calendar day.
///
/// The month is 0-based as in the rest of the date model; `+ 1` is only
/// applied by the formatting helpers ([`display_label`], [`month_label`],
/// [`crate::export::export_filename`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CalendarDate(NaiveDate);

/// Lookup key of a calendar day in the schedule store, `"{year}-{month0}-{day}"`.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateKey(String);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalendarCell {
    Empty,
    Day(CalendarDate),
}

impl CalendarDate {
    pub const MIN_YEAR: i32 = -9999;
    pub const MAX_YEAR: i32 = 9999;

    pub fn from_ymd0(year: i32, month: u32, day: u32) -> Option<Self> {
        if !(Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year) {
            return None;
        }

        NaiveDate::from_ymd_opt(year, month.checked_add(1)?, day).map(CalendarDate)
    }

    pub fn from_naive(date: NaiveDate) -> Option<Self> {
        Self::from_ymd0(date.year(), date.month0(), date.day())
    }

    /// First day of `month` in `year`, clamped to the supported year range.
    fn first_of(year: i64, month: u32) -> Self {
        let (year, month) = if year < Self::MIN_YEAR as i64 {
            (Self::MIN_YEAR, 0)
        } else if year > Self::MAX_YEAR as i64 {
            (Self::MAX_YEAR, 11)
        } else {
            (year as i32, month)
        };

        CalendarDate(
            NaiveDate::from_ymd_opt(year, month + 1, 1)
                .expect("first day of a month in the supported range"),
        )
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month0(&self) -> u32 {
        self.0.month0()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn naive(&self) -> NaiveDate {
        self.0
    }

    pub fn weekday(&self) -> Weekday {
        self.0.weekday()
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self.weekday(), Weekday::Sat | Weekday::Sun)
    }

    pub fn first_day(&self) -> Self {
        Self::first_of(self.year() as i64, self.month0())
    }

    pub fn same_month(&self, other: &CalendarDate) -> bool {
        self.year() == other.year() && self.month0() == other.month0()
    }

    /// Moves by `days`; a move that would leave the supported range stays put.
    pub fn add_days(&self, days: i64) -> Self {
        let moved = if days >= 0 {
            self.0.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            self.0.checked_sub_days(Days::new(days.unsigned_abs()))
        };

        moved.and_then(Self::from_naive).unwrap_or(*self)
    }

    pub fn key(&self) -> DateKey {
        DateKey(format!("{}-{}-{}", self.year(), self.month0(), self.day()))
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl DateKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&CalendarDate> for DateKey {
    fn from(date: &CalendarDate) -> Self {
        date.key()
    }
}

impl CalendarCell {
    pub fn date(&self) -> Option<&CalendarDate> {
        match self {
            CalendarCell::Empty => None,
            CalendarCell::Day(date) => Some(date),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CalendarCell::Empty)
    }
}

/// Number of days of the month `date` lies in.
pub fn days_of_month(date: &CalendarDate) -> u32 {
    let first = date.first_day().naive();
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };

    next.and_then(|next| next.pred_opt())
        .expect("the supported range lies well inside chrono's range")
        .day()
}

/// Leading blank cells of a Monday-first grid.
pub fn empty_slots(date: &CalendarDate) -> usize {
    let first_weekday = date.first_day().weekday().num_days_from_sunday() as usize;
    (first_weekday + 6) % 7
}

/// Cells of the month grid containing `date`: leading blanks, then one cell per
/// day. The last row is not padded.
pub fn days_in_month(date: &CalendarDate) -> Vec<CalendarCell> {
    let first = date.first_day();
    let blanks = empty_slots(&first);
    let num_days = days_of_month(&first);

    std::iter::repeat(CalendarCell::Empty)
        .take(blanks)
        .chain((0..num_days as i64).map(|offset| CalendarCell::Day(first.add_days(offset))))
        .collect()
}

pub fn date_key(date: Option<&CalendarDate>) -> Option<DateKey> {
    date.map(CalendarDate::key)
}

pub fn display_label(date: &CalendarDate) -> String {
    format!(
        "{} 年 {} 月 {} 日",
        date.year(),
        date.month0() + 1,
        date.day()
    )
}

pub fn month_label(date: &CalendarDate) -> String {
    format!("{} / {:02}", date.year(), date.month0() + 1)
}

/// First day of the month `offset` months away from the month of `date`.
pub fn advance_month(date: &CalendarDate, offset: i64) -> CalendarDate {
    let total = (date.year() as i64 * 12 + date.month0() as i64).saturating_add(offset);
    CalendarDate::first_of(total.div_euclid(12), total.rem_euclid(12) as u32)
}

/// Parses a user-typed `YYYY-MM` (1-based month) into the first of that month.
pub fn parse_month(input: &str) -> Result<CalendarDate> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", input.trim()), "%Y-%m-%d")?;

    CalendarDate::from_naive(date).ok_or_else(|| {
        Error::new(
            ErrorKind::DateParse,
            &format!("year out of range: {}", date.year()),
        )
    })
}
