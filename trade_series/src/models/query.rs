//! Request descriptor for an aggregated candle series.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{currency::Currency, period::TimePeriod, trade::pair_key};

/// Reasons a [`Query`] is rejected before touching the cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Granularity is zero or negative.
    #[error("granularity must be positive, got {0}s")]
    NonPositiveGranularity(i64),

    /// Buckets are aligned on whole seconds.
    #[error("granularity must be at least one second")]
    SubSecondGranularity,

    /// `end` is not after `start`.
    #[error("period end {end} is not after start {start}")]
    InvertedPeriod {
        /// Requested start.
        start: DateTime<Utc>,
        /// Requested end.
        end: DateTime<Utc>,
    },

    /// The interval cap must allow at least one candle.
    #[error("interval limit must be greater than zero")]
    ZeroIntervalLimit,
}

/// Upper bound on the candles of one series, whatever `max_intervals` says.
pub const MAX_INTERVALS: usize = i32::MAX as usize;

/// Whether the series reports `from/to` prices or their reciprocals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Price of `from` in `to`.
    #[default]
    None,
    /// Price of `to` in `from`.
    Invert,
}

impl Transform {
    /// The opposite transform.
    pub fn flip(self) -> Self {
        match self {
            Transform::None => Transform::Invert,
            Transform::Invert => Transform::None,
        }
    }
}

/// What series to build.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Currency being priced.
    pub from_currency: Currency,
    /// Quote currency.
    pub to_currency: Currency,
    /// Requested window.
    pub period: TimePeriod,
    /// Width of each candle.
    pub granularity: TimeDelta,
    /// Hard cap on the number of candles returned.
    pub max_intervals: usize,
    /// Also fold trades made in the `to → from` direction.
    pub include_inverse: bool,
    /// Collect contributing trade ids on each candle.
    pub include_trade_ids: bool,
    /// Report prices as-is or inverted.
    pub transform: Transform,
}

impl Query {
    /// A forward query with an interval cap of `max_intervals`.
    pub fn new(
        from: impl Into<Currency>,
        to: impl Into<Currency>,
        period: TimePeriod,
        granularity: TimeDelta,
        max_intervals: usize,
    ) -> Self {
        Self {
            from_currency: from.into(),
            to_currency: to.into(),
            period,
            granularity,
            max_intervals,
            include_inverse: false,
            include_trade_ids: false,
            transform: Transform::None,
        }
    }

    /// Builder: fold opposite-direction trades too.
    pub fn with_inverse(mut self) -> Self {
        self.include_inverse = true;
        self
    }

    /// Builder: collect trade ids.
    pub fn with_trade_ids(mut self) -> Self {
        self.include_trade_ids = true;
        self
    }

    /// Builder: report inverted prices.
    pub fn inverted(mut self) -> Self {
        self.transform = Transform::Invert;
        self
    }

    /// Reject malformed queries.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.granularity <= TimeDelta::zero() {
            return Err(QueryError::NonPositiveGranularity(
                self.granularity.num_seconds(),
            ));
        }
        if self.granularity < TimeDelta::seconds(1) {
            return Err(QueryError::SubSecondGranularity);
        }
        if self.period.end <= self.period.start {
            return Err(QueryError::InvertedPeriod {
                start: self.period.start,
                end: self.period.end,
            });
        }
        if self.max_intervals == 0 {
            return Err(QueryError::ZeroIntervalLimit);
        }
        Ok(())
    }

    /// `min(floor(period / granularity), max_intervals)`.
    ///
    /// Zero for an invalid query.
    pub fn num_intervals(&self) -> usize {
        let gran = self.granularity.num_seconds();
        if gran <= 0 {
            return 0;
        }
        let requested = self.period.length().num_seconds() / gran;
        usize::try_from(requested)
            .unwrap_or(usize::MAX)
            .min(self.max_intervals)
            .min(MAX_INTERVALS)
    }

    /// The newest `num_intervals * granularity` of the period.
    ///
    /// Oversized windows are shrunk from the front; the end never moves.
    pub fn effective_period(&self) -> TimePeriod {
        let n = i32::try_from(self.num_intervals()).unwrap_or(i32::MAX);
        // n <= period / granularity, so the product stays within the period
        TimePeriod::ending_at(self.period.end, self.granularity * n)
    }

    /// A copy of this query restricted to [`Query::effective_period`].
    pub fn truncated(&self) -> Query {
        Query {
            period: self.effective_period(),
            ..self.clone()
        }
    }

    /// Currencies of the returned candles, after the transform.
    pub fn series_direction(&self) -> (Currency, Currency) {
        match self.transform {
            Transform::None => (self.from_currency.clone(), self.to_currency.clone()),
            Transform::Invert => (self.to_currency.clone(), self.from_currency.clone()),
        }
    }

    /// Sparse-store key of trades selling `from_currency` for `to_currency`.
    pub fn forward_key(&self) -> String {
        pair_key(&self.from_currency, &self.to_currency)
    }

    /// Sparse-store key of trades in the opposite direction.
    pub fn inverse_key(&self) -> String {
        pair_key(&self.to_currency, &self.from_currency)
    }

    /// `true` if `a/b` is this query's pair in either order.
    pub fn matches_pair(&self, a: &Currency, b: &Currency) -> bool {
        (*a == self.from_currency && *b == self.to_currency)
            || (*a == self.to_currency && *b == self.from_currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn q(hours: i64, gran: TimeDelta, cap: usize) -> Query {
        Query::new(
            "LTC",
            "BTC",
            TimePeriod::new(t0(), t0() + TimeDelta::hours(hours)),
            gran,
            cap,
        )
    }

    #[test]
    fn validation() {
        assert!(q(3, TimeDelta::hours(1), 10).validate().is_ok());
        assert_eq!(
            q(3, TimeDelta::zero(), 10).validate(),
            Err(QueryError::NonPositiveGranularity(0))
        );
        assert_eq!(
            q(3, TimeDelta::milliseconds(500), 10).validate(),
            Err(QueryError::SubSecondGranularity)
        );
        assert!(matches!(
            q(-1, TimeDelta::hours(1), 10).validate(),
            Err(QueryError::InvertedPeriod { .. })
        ));
        assert_eq!(
            q(3, TimeDelta::hours(1), 0).validate(),
            Err(QueryError::ZeroIntervalLimit)
        );
    }

    #[test]
    fn intervals_are_capped_and_truncated_from_the_front() {
        let query = q(100, TimeDelta::hours(1), 10);
        assert_eq!(query.num_intervals(), 10);
        let eff = query.effective_period();
        assert_eq!(eff.end, query.period.end);
        assert_eq!(eff.start, t0() + TimeDelta::hours(90));
    }

    #[test]
    fn interval_count_and_effective_period_agree_for_huge_caps() {
        let mut query = q(0, TimeDelta::seconds(1), usize::MAX);
        query.period.end = t0() + TimeDelta::days(36_500);
        let n = query.num_intervals();
        assert_eq!(n, MAX_INTERVALS);
        let eff = query.effective_period();
        assert_eq!(eff.length(), TimeDelta::seconds(n as i64));
    }

    #[test]
    fn uneven_period_is_truncated() {
        let mut query = q(3, TimeDelta::hours(1), 10);
        query.period.end += TimeDelta::minutes(30);
        assert_eq!(query.num_intervals(), 3);
        assert_eq!(query.effective_period().start, t0() + TimeDelta::minutes(30));
    }

    #[test]
    fn narrow_period_has_no_intervals() {
        let mut query = q(0, TimeDelta::hours(1), 10);
        query.period.end = t0() + TimeDelta::minutes(59);
        assert!(query.validate().is_ok());
        assert_eq!(query.num_intervals(), 0);
        assert!(query.effective_period().is_empty());
    }

    #[test]
    fn direction_helpers() {
        let query = q(1, TimeDelta::hours(1), 1);
        assert_eq!(query.forward_key(), "BTC/LTC");
        assert_eq!(query.inverse_key(), "LTC/BTC");
        assert!(query.matches_pair(&"BTC".into(), &"LTC".into()));
        assert!(!query.matches_pair(&"BTC".into(), &"DOGE".into()));
        let inv = query.inverted();
        assert_eq!(inv.series_direction(), ("BTC".into(), "LTC".into()));
    }
}
