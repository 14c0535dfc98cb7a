//! Time-bucketed OHLC + two-sided volume aggregate.
//!
//! A [`Candle`] starts empty (`open == 0.0`) and is filled by repeated
//! merges of trades or other candles. Merges are expected in ascending time
//! order; `close` is simply the last price merged.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{
    currency::Currency,
    trade::{TradeId, TradeRecord},
};

/// One bucket of one currency-pair direction.
///
/// Prices are the price of `from_currency` in `to_currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Currency being priced.
    pub from_currency: Currency,
    /// Currency the price is quoted in.
    pub to_currency: Currency,
    /// Exclusive end of the bucket.
    pub bucket_end: DateTime<Utc>,
    /// First price, `0.0` while empty.
    pub open: f64,
    /// Highest price.
    pub high: f64,
    /// Lowest price.
    pub low: f64,
    /// Last price.
    pub close: f64,
    /// Total of `from_currency` traded.
    pub from_volume: Decimal,
    /// Total of `to_currency` traded.
    pub to_volume: Decimal,
    /// Identifiers of the contributing trades, when requested.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trade_ids: Vec<TradeId>,
}

impl Candle {
    /// An empty candle for `from/to` ending at `bucket_end`.
    pub fn empty(from: Currency, to: Currency, bucket_end: DateTime<Utc>) -> Self {
        Self {
            from_currency: from,
            to_currency: to,
            bucket_end,
            open: 0.0,
            high: 0.0,
            low: 0.0,
            close: 0.0,
            from_volume: Decimal::ZERO,
            to_volume: Decimal::ZERO,
            trade_ids: Vec::new(),
        }
    }

    /// `true` until the first merge.
    pub fn is_empty(&self) -> bool {
        self.open == 0.0
    }

    /// Fold one trade into the candle.
    ///
    /// The trade must already be oriented like the candle (its `from` side is
    /// `from_currency`) and must not be dust.
    pub fn update_from_trade(&mut self, trade: &TradeRecord, include_trade_ids: bool) {
        let price = trade.price();
        self.merge_prices(price, price, price, price);
        self.from_volume += trade.from.amount;
        self.to_volume += trade.to.amount;
        if include_trade_ids {
            if let Some(id) = &trade.id {
                self.trade_ids.push(id.clone());
            }
        }
    }

    /// Fold a whole candle into this one.
    ///
    /// The source's open and close are treated as the first and last samples
    /// of its range. An empty source changes nothing.
    pub fn update_from_candle(&mut self, other: &Candle, include_trade_ids: bool) {
        if other.is_empty() {
            return;
        }
        self.merge_prices(other.open, other.high, other.low, other.close);
        self.from_volume += other.from_volume;
        self.to_volume += other.to_volume;
        if include_trade_ids {
            self.trade_ids.extend(other.trade_ids.iter().cloned());
        }
    }

    fn merge_prices(&mut self, open: f64, high: f64, low: f64, close: f64) {
        if self.is_empty() {
            self.open = open;
            self.high = open;
            self.low = open;
        }
        self.high = self.high.max(high);
        self.low = self.low.min(low);
        self.close = close;
    }

    /// The same bucket seen from the other side of the pair.
    ///
    /// Every price becomes its reciprocal. Because the reciprocal reverses
    /// order, the new high is `1/low` and the new low is `1/high`. Volumes and
    /// currencies swap sides.
    pub fn inverse(&self) -> Candle {
        Candle {
            from_currency: self.to_currency.clone(),
            to_currency: self.from_currency.clone(),
            bucket_end: self.bucket_end,
            open: reciprocal(self.open),
            high: reciprocal(self.low),
            low: reciprocal(self.high),
            close: reciprocal(self.close),
            from_volume: self.to_volume,
            to_volume: self.from_volume,
            trade_ids: self.trade_ids.clone(),
        }
    }
}

fn reciprocal(p: f64) -> f64 {
    if p == 0.0 { 0.0 } else { 1.0 / p }
}
