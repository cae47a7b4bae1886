use crate::error::{SeatileError, SeatileResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const TIME_KEY_YEAR_MIN: i32 = 1900;
pub const TIME_KEY_YEAR_MAX: i32 = 2100;

/// Month selector on the data time axis, written `YYYYMM`.
///
/// Parsing enforces the user-facing range and `step` saturates at its ends, so
/// every key round-trips through its string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeKey {
    year: i32,
    month: u8,
}

impl TimeKey {
    pub fn parse(input: &str) -> SeatileResult<Self> {
        if input.len() != 6 || !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SeatileError::invalid_input(format!(
                "time must be formatted YYYYMM (for example 202401), got {input:?}"
            )));
        }
        let year: i32 = input[..4]
            .parse()
            .map_err(|_| SeatileError::invalid_input(format!("invalid year in {input:?}")))?;
        let month: u8 = input[4..]
            .parse()
            .map_err(|_| SeatileError::invalid_input(format!("invalid month in {input:?}")))?;
        if !(TIME_KEY_YEAR_MIN..=TIME_KEY_YEAR_MAX).contains(&year) || !(1..=12).contains(&month)
        {
            return Err(SeatileError::invalid_input(format!(
                "year must be in {TIME_KEY_YEAR_MIN}..={TIME_KEY_YEAR_MAX} and month in 1..=12, got {input:?}"
            )));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    /// Moves by `months`, rolling the year over on under/overflow and
    /// stopping at 190001 and 210012.
    pub fn step(self, months: i32) -> Self {
        let first = TIME_KEY_YEAR_MIN as i64 * 12;
        let last = TIME_KEY_YEAR_MAX as i64 * 12 + 11;
        let index = (self.year as i64 * 12 + (self.month as i64 - 1) + months as i64)
            .clamp(first, last);
        Self {
            year: index.div_euclid(12) as i32,
            month: (index.rem_euclid(12) + 1) as u8,
        }
    }

    pub fn display(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

impl Default for TimeKey {
    fn default() -> Self {
        Self {
            year: 2024,
            month: 1,
        }
    }
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

impl FromStr for TimeKey {
    type Err = SeatileError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for TimeKey {
    type Error = SeatileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TimeKey> for String {
    fn from(value: TimeKey) -> Self {
        value.to_string()
    }
}
