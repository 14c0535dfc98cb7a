//! Half-open UTC time intervals.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A half-open interval `[start, end)` in UTC.
///
/// A period whose `end` is not after its `start` is empty. Construction does
/// not reject such periods; [`crate::models::Query::validate`] does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimePeriod {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Exclusive end.
    pub end: DateTime<Utc>,
}

impl TimePeriod {
    /// Create `[start, end)`.
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The interval of `length` ending at `end`.
    pub fn ending_at(end: DateTime<Utc>, length: TimeDelta) -> Self {
        Self::new(end - length, end)
    }

    /// Duration of the interval (zero when empty).
    pub fn length(&self) -> TimeDelta {
        if self.is_empty() {
            TimeDelta::zero()
        } else {
            self.end - self.start
        }
    }

    /// `true` when no instant lies in the interval.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// `start <= ts < end`.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }

    /// `true` when `other` lies entirely inside `self`.
    ///
    /// An empty period is covered by any period.
    pub fn covers(&self, other: &TimePeriod) -> bool {
        other.is_empty() || (self.start <= other.start && other.end <= self.end)
    }
}
