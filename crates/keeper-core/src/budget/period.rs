//! Reset-period calculations
//!
//! Each user picks a day of the month (1-29) on which accumulated category
//! spending is zeroed. The reset date for a month is that day at midnight UTC,
//! clamped to the 28th in February.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Day of month on which a budget period starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct ResetDay(u32);

impl ResetDay {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 29;

    pub fn new(day: u32) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&day) {
            Ok(Self(day))
        } else {
            Err(Error::InvalidData(format!(
                "reset day must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                day
            )))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for ResetDay {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<i64> for ResetDay {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        let day = u32::try_from(value)
            .map_err(|_| Error::InvalidData(format!("invalid reset day: {}", value)))?;
        Self::new(day)
    }
}

impl From<ResetDay> for u32 {
    fn from(day: ResetDay) -> Self {
        day.0
    }
}

impl std::str::FromStr for ResetDay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let day: u32 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidData(format!("invalid reset day: {}", s)))?;
        Self::new(day)
    }
}

impl std::fmt::Display for ResetDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Reset date for the month containing `reference`
pub fn reset_date_for(reference: DateTime<Utc>, day: ResetDay) -> DateTime<Utc> {
    let year = reference.year();
    let month = reference.month();

    let effective_day = if month == 2 && day.get() > 28 {
        28
    } else {
        day.get()
    };

    // Every month has at least 28 days and only February has fewer than 30
    let date = NaiveDate::from_ymd_opt(year, month, effective_day)
        .unwrap_or_else(|| reference.date_naive());

    midnight(date)
}

/// Whether a budget reset is due
///
/// A user that has never been reset is not reset: categories need at least
/// one period of spending first. Otherwise the reset is due once `now` has
/// reached this period's reset date and the last reset predates it.
pub fn should_reset(
    last_reset: Option<DateTime<Utc>>,
    period_start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    match last_reset {
        None => false,
        Some(last) => now >= period_start && last < period_start,
    }
}

/// Latest reset date at or before `now`
pub fn current_period_start(now: DateTime<Utc>, day: ResetDay) -> DateTime<Utc> {
    let this_month = reset_date_for(now, day);
    if this_month <= now {
        return this_month;
    }

    let (year, month) = if now.month() == 1 {
        (now.year() - 1, 12)
    } else {
        (now.year(), now.month() - 1)
    };
    let previous_month = NaiveDate::from_ymd_opt(year, month, 1)
        .map(midnight)
        .unwrap_or(this_month);

    reset_date_for(previous_month, day)
}

/// First reset date strictly after `now`
pub fn next_reset_date(now: DateTime<Utc>, day: ResetDay) -> DateTime<Utc> {
    let this_month = reset_date_for(now, day);
    if this_month > now {
        return this_month;
    }

    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    let next_month = NaiveDate::from_ymd_opt(year, month, 1)
        .map(midnight)
        .unwrap_or(this_month);

    reset_date_for(next_month, day)
}
