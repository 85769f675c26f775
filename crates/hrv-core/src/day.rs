//! UTC calendar days used to partition telemetry storage
//!
//! A partition name is a pure function of the UTC calendar day:
//! `HRV-YYYYMMDD.txt`, with the day-of-month (never the weekday).

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::{HrvError, HrvResult};

/// Partition file prefix
pub const PARTITION_PREFIX: &str = "HRV-";

/// Partition file suffix
pub const PARTITION_SUFFIX: &str = ".txt";

/// Seconds in one UTC day
pub const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// A UTC calendar day
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

impl DayKey {
    /// Build from a calendar date (month is 1-based)
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(DayKey)
    }

    /// The UTC day containing a Unix timestamp
    pub fn from_unix_secs(secs: i64) -> HrvResult<Self> {
        DateTime::<Utc>::from_timestamp(secs, 0)
            .map(|dt| DayKey(dt.date_naive()))
            .ok_or_else(|| HrvError::InvalidRecord(format!("timestamp {} out of range", secs)))
    }

    #[inline]
    pub fn year(self) -> i32 {
        self.0.year()
    }

    /// 1-based month
    #[inline]
    pub fn month(self) -> u32 {
        self.0.month()
    }

    /// 0-based month, as the device expects it
    #[inline]
    pub fn month0(self) -> u32 {
        self.0.month0()
    }

    /// Day of month
    #[inline]
    pub fn day(self) -> u32 {
        self.0.day()
    }

    /// Unix timestamp of 00:00:00 UTC on this day
    pub fn start_unix_secs(self) -> i64 {
        self.0
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default()
    }

    pub fn succ(self) -> Option<Self> {
        self.0.succ_opt().map(DayKey)
    }

    /// Every day from `first` to `last` inclusive; empty if `first > last`
    pub fn span(first: DayKey, last: DayKey) -> Vec<DayKey> {
        let mut days = Vec::new();
        let mut cursor = Some(first);
        while let Some(day) = cursor {
            if day > last {
                break;
            }
            days.push(day);
            cursor = day.succ();
        }
        days
    }

    /// Name of the partition holding this day's records
    pub fn partition_name(self) -> String {
        format!(
            "{}{:04}{:02}{:02}{}",
            PARTITION_PREFIX,
            self.year(),
            self.month(),
            self.day(),
            PARTITION_SUFFIX
        )
    }
}

impl fmt::Debug for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Day({})", self.0)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
