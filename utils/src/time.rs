//! Conversions between 100-nanosecond ticks and calendar types.
//!
//! Date-time payloads count ticks since `0001-01-01T00:00:00Z` (proleptic Gregorian, UTC).
//! Time-span payloads count signed ticks.

use chrono::{DateTime, TimeDelta, Utc};

/// Number of ticks in one second.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Nanoseconds in one tick.
const NANOS_PER_TICK: i64 = 100;

/// Ticks between `0001-01-01T00:00:00Z` and the Unix epoch.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Converts a tick count into a UTC date-time.
///
/// Returns `None` if the instant is not representable.
pub fn ticks_to_date_time(ticks: i64) -> Option<DateTime<Utc>> {
    let unix = ticks.checked_sub(UNIX_EPOCH_TICKS)?;
    let secs = unix.div_euclid(TICKS_PER_SECOND);
    let nanos = unix.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK;
    DateTime::from_timestamp(secs, nanos as u32)
}

/// Converts a UTC date-time into a tick count, truncating sub-tick precision.
///
/// Returns `None` if the date-time lies outside the range of ticks.
pub fn date_time_to_ticks(date_time: &DateTime<Utc>) -> Option<i64> {
    let secs = date_time.timestamp();
    let ticks = i64::from(date_time.timestamp_subsec_nanos()) / NANOS_PER_TICK;
    secs.checked_mul(TICKS_PER_SECOND)?
        .checked_add(ticks)?
        .checked_add(UNIX_EPOCH_TICKS)
}

/// Converts a signed tick count into a duration.
pub fn ticks_to_time_span(ticks: i64) -> TimeDelta {
    let secs = ticks.div_euclid(TICKS_PER_SECOND);
    let nanos = ticks.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK;
    TimeDelta::seconds(secs) + TimeDelta::nanoseconds(nanos)
}

/// Converts a duration into a signed tick count, truncating sub-tick precision.
///
/// Returns `None` if the duration overflows the range of ticks.
pub fn time_span_to_ticks(span: &TimeDelta) -> Option<i64> {
    let secs = span.num_seconds();
    let ticks = i64::from(span.subsec_nanos()) / NANOS_PER_TICK;
    secs.checked_mul(TICKS_PER_SECOND)?.checked_add(ticks)
}
