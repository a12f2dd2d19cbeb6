use std::fmt;
use std::fmt::Formatter;
use std::str::FromStr;

use jiff::civil::{Date, DateTime};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
#[error("{0}")]
pub struct ParseError(pub String);

/// A calendar month, no timezone attached.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Hash)]
pub struct Month(Date);

impl Month {
    pub fn new(year: i16, month: i8) -> Result<Month, ParseError> {
        Date::new(year, month, 1)
            .map(Month)
            .map_err(|e| ParseError(format!("Invalid month {}-{}: {}", year, month, e)))
    }

    /// Return the month that contains this date.
    pub fn containing(date: Date) -> Month {
        Month(date.first_of_month())
    }

    pub fn year(&self) -> i16 {
        self.0.year()
    }

    pub fn month(&self) -> i8 {
        self.0.month()
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

fn all_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

/// Parse the period formats the EIA API uses for its different frequencies:
/// `2024`, `2024-Q3`, `2024-07`, `2024-07-15` and `2024-07-15T00:00:00`.
impl FromStr for Month {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseError(format!("Failed parsing {} as a month", s));

        if all_digits(s, 4) {
            let year = s.parse::<i16>().map_err(|_| err())?;
            return Month::new(year, 1);
        }
        if let Some((year, quarter)) = s.split_once("-Q") {
            if !all_digits(year, 4) || !all_digits(quarter, 1) {
                return Err(err());
            }
            let year = year.parse::<i16>().map_err(|_| err())?;
            let quarter = quarter.parse::<i8>().map_err(|_| err())?;
            if !(1..=4).contains(&quarter) {
                return Err(err());
            }
            return Month::new(year, 3 * quarter - 2);
        }
        if s.len() == 7 {
            let (year, month) = s.split_once('-').ok_or_else(err)?;
            if !all_digits(year, 4) || !all_digits(month, 2) {
                return Err(err());
            }
            let year = year.parse::<i16>().map_err(|_| err())?;
            let month = month.parse::<i8>().map_err(|_| err())?;
            return Month::new(year, month);
        }
        if let Ok(dt) = s.parse::<DateTime>() {
            return Ok(Month::containing(dt.date()));
        }
        s.parse::<Date>()
            .map(Month::containing)
            .map_err(|_| err())
    }
}
