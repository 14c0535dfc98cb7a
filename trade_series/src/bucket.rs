//! Epoch-aligned bucket math for candles.
//!
//! - One stable epoch: Unix (1970-01-01T00:00:00Z).
//! - Fixed-width buckets only, second-based math.
//! - A bucket is labelled by its exclusive *end*; a timestamp is mapped to the
//!   end by rounding **up**, so an instant exactly on a boundary belongs to the
//!   bucket ending at that instant.
//!
//! All functions assume UTC.

use chrono::{DateTime, TimeDelta, Utc};

/// Unix epoch start (1970-01-01T00:00:00Z).
pub const EPOCH_UNIX: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// Number of seconds in a minute.
pub const SECS_PER_MINUTE: i64 = 60;
/// Number of seconds in an hour.
pub const SECS_PER_HOUR: i64 = 60 * SECS_PER_MINUTE;
/// Number of seconds in a day.
pub const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;
/// Number of seconds in a week.
pub const SECS_PER_WEEK: i64 = 7 * SECS_PER_DAY;

/// End of the epoch-aligned bucket of `width` that contains `ts`.
///
/// Rounds up to the next multiple of `width` (in whole seconds). A timestamp
/// with a fractional second is rounded into the following second first.
/// Widths under one second collapse every timestamp onto the epoch.
pub fn bucket_end_ceil(ts: DateTime<Utc>, width: TimeDelta) -> DateTime<Utc> {
    let width_secs = width.num_seconds();
    if width_secs < 1 {
        return EPOCH_UNIX;
    }
    let secs = ts.timestamp();
    let has_fraction = ts.timestamp_subsec_nanos() > 0;
    from_secs(ceil_fixed(secs, has_fraction, width_secs))
}

/// Index of the dense bucket that a cached bucket end falls into.
///
/// Dense buckets of `granularity` start at `series_start`; bucket `i` covers
/// `(series_start + i*g, series_start + (i+1)*g]` by end time. Returns `None`
/// for ends at or before `series_start`.
pub fn dense_index(
    bucket_end: DateTime<Utc>,
    series_start: DateTime<Utc>,
    granularity: TimeDelta,
) -> Option<usize> {
    let gran = granularity.num_seconds();
    let offset = bucket_end.signed_duration_since(series_start).num_seconds();
    if gran < 1 || offset < 1 {
        return None;
    }
    usize::try_from((offset - 1) / gran).ok()
}

// ----- fixed-size internals -----

fn ceil_fixed(secs: i64, has_fraction: bool, width_secs: i64) -> i64 {
    let rem = secs.rem_euclid(width_secs);
    if rem == 0 && !has_fraction {
        secs
    } else {
        secs - rem + width_secs
    }
}

fn from_secs(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or(EPOCH_UNIX)
}
