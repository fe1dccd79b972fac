//! Calendar and duration values carried as 100-nanosecond ticks.
//!
//! Ticks count from 0001-01-01T00:00:00. Conversions to and from `chrono`
//! are provided for callers that work with real date types.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta, TimeZone, Utc};

/// Ticks in one second.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Ticks at 1970-01-01T00:00:00.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// How a [`Timestamp`] should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum TimestampKind {
    /// No time zone information.
    #[default]
    Unspecified = 0,
    /// Coordinated Universal Time.
    Utc = 1,
    /// Local time of the producer.
    Local = 2,
}

impl From<TimestampKind> for i32 {
    fn from(kind: TimestampKind) -> Self {
        kind as i32
    }
}

impl TryFrom<i32> for TimestampKind {
    type Error = i32;

    fn try_from(raw: i32) -> std::result::Result<Self, Self::Error> {
        match raw {
            0 => Ok(TimestampKind::Unspecified),
            1 => Ok(TimestampKind::Utc),
            2 => Ok(TimestampKind::Local),
            other => Err(other),
        }
    }
}

/// Calendar timestamp: kind tag plus ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Timestamp {
    /// Interpretation of `ticks`.
    pub kind: TimestampKind,
    /// 100 ns ticks since 0001-01-01.
    pub ticks: i64,
}

impl Timestamp {
    /// Create a timestamp from raw parts.
    pub const fn new(ticks: i64, kind: TimestampKind) -> Self {
        Self { kind, ticks }
    }

    /// UTC timestamp from a chrono date. Saturates outside the tick range.
    pub fn from_utc(value: DateTime<Utc>) -> Self {
        Self::new(ticks_from_naive(value.naive_utc()), TimestampKind::Utc)
    }

    /// Unspecified-kind timestamp from a naive chrono date.
    pub fn from_naive(value: NaiveDateTime) -> Self {
        Self::new(ticks_from_naive(value), TimestampKind::Unspecified)
    }

    /// Naive date for these ticks, ignoring the kind.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        naive_from_ticks(self.ticks)
    }

    /// Ticks read as UTC, ignoring the kind.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        self.to_naive().map(|naive| naive.and_utc())
    }
}

/// Timestamp with a fixed UTC offset.
///
/// `ticks` is the local clock reading; `offset_ticks` is local minus UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimestampOffset {
    /// Local clock ticks.
    pub ticks: i64,
    /// Offset from UTC in ticks.
    pub offset_ticks: i64,
}

impl TimestampOffset {
    /// Create from raw parts.
    pub const fn new(ticks: i64, offset_ticks: i64) -> Self {
        Self {
            ticks,
            offset_ticks,
        }
    }

    /// Convert from a chrono date with a fixed offset.
    pub fn from_datetime(value: DateTime<FixedOffset>) -> Self {
        Self::new(
            ticks_from_naive(value.naive_local()),
            i64::from(value.offset().local_minus_utc()) * TICKS_PER_SECOND,
        )
    }

    /// Convert to a chrono date. `None` if the ticks or offset are out of range.
    pub fn to_datetime(&self) -> Option<DateTime<FixedOffset>> {
        let seconds = i32::try_from(self.offset_ticks / TICKS_PER_SECOND).ok()?;
        let offset = FixedOffset::east_opt(seconds)?;
        let local = naive_from_ticks(self.ticks)?;
        offset.from_local_datetime(&local).single()
    }
}

/// Ticks for a duration. Sub-tick precision is truncated toward zero.
pub fn ticks_from_delta(delta: TimeDelta) -> i64 {
    delta
        .num_seconds()
        .saturating_mul(TICKS_PER_SECOND)
        .saturating_add(i64::from(delta.subsec_nanos()) / 100)
}

/// Duration for a tick count.
pub fn delta_from_ticks(ticks: i64) -> TimeDelta {
    TimeDelta::seconds(ticks / TICKS_PER_SECOND)
        + TimeDelta::nanoseconds((ticks % TICKS_PER_SECOND) * 100)
}

fn ticks_from_naive(value: NaiveDateTime) -> i64 {
    let utc = value.and_utc();
    utc.timestamp()
        .saturating_mul(TICKS_PER_SECOND)
        .saturating_add(i64::from(utc.timestamp_subsec_nanos()) / 100)
        .saturating_add(UNIX_EPOCH_TICKS)
}

fn naive_from_ticks(ticks: i64) -> Option<NaiveDateTime> {
    let since_epoch = ticks.checked_sub(UNIX_EPOCH_TICKS)?;
    let seconds = since_epoch.div_euclid(TICKS_PER_SECOND);
    let nanos = (since_epoch.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
    DateTime::from_timestamp(seconds, nanos).map(|utc| utc.naive_utc())
}
