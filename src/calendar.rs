//! Calendar periods used as aggregation keys
//!
//! Monthly series are keyed by [`YearMonth`]; intra-month distribution is
//! keyed by pentad (5-day bucket within a month).

use crate::errors::{HidroError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Short month labels used on chart axes
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

/// Number of pentads in a month. Day 31 belongs to the last one.
pub const PENTADS_PER_MONTH: u8 = 6;

/// A calendar month, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Build a period, rejecting months outside 1..=12
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(HidroError::InvalidPeriod {
                value: format!("{year:04}-{month:02}"),
            });
        }
        Ok(Self { year, month })
    }

    /// Period containing `date`
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First day of the month
    pub fn first_day(self) -> NaiveDate {
        // Validated in `new`/`of`, so the date always exists.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Next calendar month
    #[must_use]
    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Fractional year at the start of the month, used as a chart x coordinate
    pub fn decimal_year(self) -> f64 {
        f64::from(self.year) + f64::from(self.month - 1) / 12.0
    }

    /// Number of days in the month
    pub fn days_in_month(self) -> u32 {
        let next = self.succ().first_day();
        (next - self.first_day()).num_days() as u32
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for YearMonth {
    type Err = HidroError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || HidroError::InvalidPeriod {
            value: s.to_string(),
        };
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        YearMonth::new(year, month).map_err(|_| invalid())
    }
}

/// Pentad (1..=6) of a day of month: days 1-5 → 1, 6-10 → 2, ..., 26-31 → 6
pub fn pentad_of_day(day: u32) -> u8 {
    let pentad = day.saturating_add(4) / 5;
    pentad.clamp(1, u32::from(PENTADS_PER_MONTH)) as u8
}

/// Human-readable label for a pentad, e.g. `P3 (dias 11-15)`
pub fn pentad_label(pentad: u8) -> String {
    let first = (u32::from(pentad) - 1) * 5 + 1;
    let last = if pentad == PENTADS_PER_MONTH {
        31
    } else {
        first + 4
    };
    format!("P{pentad} (dias {first}-{last})")
}
