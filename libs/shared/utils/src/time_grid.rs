// libs/shared/utils/src/time_grid.rs
//
// Clinic calendar arithmetic. Appointment instants are absolute (UTC) while
// shifts and day boundaries are local-calendar concepts; the fixed clinic
// offset is applied here and nowhere else.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use shared_config::SchedulingConfig;

pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 7;
pub const DEFAULT_SLOT_MINUTES: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeGridError {
    #[error("Invalid date format (expected YYYY-MM-DD): {0}")]
    InvalidDateFormat(String),

    #[error("Invalid time format (expected HH:mm): {0}")]
    InvalidTimeFormat(String),

    #[error("Invalid UTC offset: {0} hours")]
    InvalidOffset(i32),

    #[error("Slot step and conflict window must be positive")]
    InvalidGranularity,
}

// ==============================================================================
// TIME OF DAY
// ==============================================================================

/// Zero-padded 24h `HH:mm` wall-clock time, stored as minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    minutes: u16,
}

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay { minutes: 0 };

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { minutes: (hour * 60 + minute) as u16 })
        } else {
            None
        }
    }

    /// Strict parse: exactly two digits, a colon, two digits.
    pub fn parse(value: &str) -> Result<Self, TimeGridError> {
        let invalid = || TimeGridError::InvalidTimeFormat(value.to_string());
        let bytes = value.as_bytes();

        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(invalid());
        }
        if ![0, 1, 3, 4].iter().all(|&i| bytes[i].is_ascii_digit()) {
            return Err(invalid());
        }

        let hour = u32::from(bytes[0] - b'0') * 10 + u32::from(bytes[1] - b'0');
        let minute = u32::from(bytes[3] - b'0') * 10 + u32::from(bytes[4] - b'0');

        Self::from_hm(hour, minute).ok_or_else(invalid)
    }

    pub fn hour(&self) -> u32 {
        u32::from(self.minutes / 60)
    }

    pub fn minute(&self) -> u32 {
        u32::from(self.minutes % 60)
    }

    pub fn minutes_since_midnight(&self) -> i64 {
        i64::from(self.minutes)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeGridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TimeOfDay::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Inclusive on both ends: `start <= time <= end`.
pub fn time_is_between(time: TimeOfDay, start: TimeOfDay, end: TimeOfDay) -> bool {
    time >= start && time <= end
}

/// Half-open interval overlap of `[start1, end1)` and `[start2, end2)`.
pub fn ranges_overlap(start1: TimeOfDay, end1: TimeOfDay, start2: TimeOfDay, end2: TimeOfDay) -> bool {
    start1 < end2 && start2 < end1
}

// ==============================================================================
// CIVIL DATE
// ==============================================================================

/// A calendar day of the clinic, together with the absolute instant of its
/// local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CivilDate {
    date: NaiveDate,
    midnight_utc: DateTime<Utc>,
}

impl CivilDate {
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn midnight_utc(&self) -> DateTime<Utc> {
        self.midnight_utc
    }

    /// 0 = Sunday .. 6 = Saturday, read off the clinic calendar.
    pub fn day_of_week(&self) -> u8 {
        self.date.weekday().num_days_from_sunday() as u8
    }

    pub fn add_days(&self, days: i64) -> Self {
        Self {
            date: self.date + Duration::days(days),
            midnight_utc: self.midnight_utc + Duration::days(days),
        }
    }

    pub fn next_day(&self) -> Self {
        self.add_days(1)
    }
}

impl fmt::Display for CivilDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date.format("%Y-%m-%d"))
    }
}

impl Serialize for CivilDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ==============================================================================
// TIME GRID
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeGrid {
    offset: FixedOffset,
    step: Duration,
    window: Duration,
}

impl Default for TimeGrid {
    fn default() -> Self {
        Self {
            offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600).unwrap_or(Utc.fix()),
            step: Duration::minutes(DEFAULT_SLOT_MINUTES),
            window: Duration::minutes(DEFAULT_SLOT_MINUTES),
        }
    }
}

impl TimeGrid {
    pub fn new(offset_hours: i32, step_minutes: i64, window_minutes: i64) -> Result<Self, TimeGridError> {
        let offset = FixedOffset::east_opt(offset_hours * 3600)
            .ok_or(TimeGridError::InvalidOffset(offset_hours))?;

        if step_minutes <= 0 || window_minutes <= 0 {
            return Err(TimeGridError::InvalidGranularity);
        }

        Ok(Self {
            offset,
            step: Duration::minutes(step_minutes),
            window: Duration::minutes(window_minutes),
        })
    }

    pub fn from_config(config: &SchedulingConfig) -> Result<Self, TimeGridError> {
        Self::new(
            config.utc_offset_hours,
            config.slot_step_minutes,
            config.conflict_window_minutes,
        )
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Parses a strict `YYYY-MM-DD` string into a clinic day.
    pub fn civil_date(&self, value: &str) -> Result<CivilDate, TimeGridError> {
        let invalid = || TimeGridError::InvalidDateFormat(value.to_string());
        let bytes = value.as_bytes();

        if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return Err(invalid());
        }
        let digits_ok = bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
        if !digits_ok {
            return Err(invalid());
        }

        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?;
        Ok(self.civil_date_from_naive(date))
    }

    pub fn civil_date_from_naive(&self, date: NaiveDate) -> CivilDate {
        let local_midnight = date.and_time(NaiveTime::MIN);
        let midnight_utc = (local_midnight - Duration::seconds(i64::from(self.offset.local_minus_utc())))
            .and_utc();

        CivilDate { date, midnight_utc }
    }

    /// Absolute instant of `time` on the clinic day `date`.
    pub fn at(&self, date: &CivilDate, time: TimeOfDay) -> DateTime<Utc> {
        date.midnight_utc() + Duration::minutes(time.minutes_since_midnight())
    }

    /// Slot instants of a shift: `start`, `start + step`, ... while `< end`.
    pub fn shift_slots(&self, date: &CivilDate, start: TimeOfDay, end: TimeOfDay) -> Vec<DateTime<Utc>> {
        let end_instant = self.at(date, end);
        let mut slots = Vec::new();
        let mut current = self.at(date, start);

        while current < end_instant {
            slots.push(current);
            current += self.step;
        }

        slots
    }

    /// Two instants conflict when they are strictly closer than the window.
    pub fn conflicts(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        let distance = if a >= b { a - b } else { b - a };
        distance < self.window
    }

    /// `YYYY-MM-DDTHH:mm` in the clinic offset.
    pub fn format_local(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.offset)
            .format("%Y-%m-%dT%H:%M")
            .to_string()
    }

    pub fn local_date_of(&self, instant: DateTime<Utc>) -> CivilDate {
        self.civil_date_from_naive(instant.with_timezone(&self.offset).date_naive())
    }

    /// Wall-clock time of `instant` in the clinic offset, seconds dropped.
    pub fn local_time_of(&self, instant: DateTime<Utc>) -> TimeOfDay {
        let local = instant.with_timezone(&self.offset);
        TimeOfDay {
            minutes: (local.hour() * 60 + local.minute()) as u16,
        }
    }

    pub fn today(&self, now: DateTime<Utc>) -> CivilDate {
        self.local_date_of(now)
    }

    /// Bucket index used by storage-level slot guards.
    pub fn slot_bucket(&self, instant: DateTime<Utc>) -> i64 {
        instant.timestamp().div_euclid(self.window.num_seconds())
    }
}
