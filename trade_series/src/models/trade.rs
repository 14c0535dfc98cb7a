//! Matched trades as reported by the ledger and live sources.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::models::currency::{Asset, Currency};

/// Amounts whose magnitude is below this are dust and never aggregated.
///
/// 2.22e-16, the double-precision machine epsilon.
pub const DUST_EPSILON: Decimal = Decimal::from_parts(222, 0, 0, false, 18);

/// Opaque identifier of a trade (an order or transaction hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeId(String);

impl TradeId {
    /// Wrap an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a source could decode a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validity {
    /// Decoded and usable.
    #[default]
    Valid,
    /// Looked like a trade but failed to decode.
    Invalid,
    /// Carried no trade at all.
    Empty,
}

/// One matched trade: `from` was given in exchange for `to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Present when the source knows (and the caller asked for) the id.
    #[serde(default)]
    pub id: Option<TradeId>,
    /// The side that was sold.
    pub from: Asset,
    /// The side that was bought.
    pub to: Asset,
    /// When the trade completed.
    pub timestamp: DateTime<Utc>,
    /// Source decode status.
    #[serde(default)]
    pub validity: Validity,
}

impl TradeRecord {
    /// Convenience constructor for a valid trade.
    pub fn new(from: Asset, to: Asset, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            from,
            to,
            timestamp,
            validity: Validity::Valid,
        }
    }

    /// Attach an identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(TradeId::new(id));
        self
    }

    /// Price of one unit of `from` expressed in `to`.
    pub fn price(&self) -> f64 {
        if self.from.amount.is_zero() {
            return 0.0;
        }
        match self.to.amount.checked_div(self.from.amount) {
            Some(q) if !q.is_zero() || self.to.amount.is_zero() => q.to_f64().unwrap_or(0.0),
            // quotient outside Decimal range or precision
            _ => match (self.to.amount.to_f64(), self.from.amount.to_f64()) {
                (Some(to), Some(from)) if from != 0.0 => to / from,
                _ => 0.0,
            },
        }
    }

    /// `true` if either side is below [`DUST_EPSILON`].
    pub fn is_dust(&self) -> bool {
        self.from.amount.abs() < DUST_EPSILON || self.to.amount.abs() < DUST_EPSILON
    }

    /// Directed key of the sparse store: `"TO/FROM"`.
    pub fn pair_key(&self) -> String {
        pair_key(&self.from.currency, &self.to.currency)
    }

    /// The same trade seen from the other side.
    pub fn reversed(&self) -> Self {
        Self {
            id: self.id.clone(),
            from: self.to.clone(),
            to: self.from.clone(),
            timestamp: self.timestamp,
            validity: self.validity,
        }
    }
}

/// Directed pair key for trades selling `from` for `to`.
pub fn pair_key(from: &Currency, to: &Currency) -> String {
    format!("{to}/{from}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn trade(from: Decimal, to: Decimal) -> TradeRecord {
        TradeRecord::new(
            Asset::new("LTC", from),
            Asset::new("BTC", to),
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn price_is_to_over_from() {
        let t = trade(Decimal::from(10), Decimal::from(20));
        assert_eq!(t.price(), 2.0);
        assert_eq!(t.reversed().price(), 0.5);
        assert_eq!(t.pair_key(), "BTC/LTC");
        assert_eq!(t.reversed().pair_key(), "LTC/BTC");
    }

    #[test]
    fn dust_on_either_side() {
        assert!(trade(Decimal::ZERO, Decimal::ONE).is_dust());
        assert!(trade(Decimal::ONE, Decimal::new(1, 17)).is_dust());
        assert!(trade(Decimal::ONE, -Decimal::new(1, 17)).is_dust());
        assert!(!trade(Decimal::ONE, Decimal::new(1, 15)).is_dust());
        assert_eq!(DUST_EPSILON.to_string(), "0.000000000000000222");
    }

    #[test]
    fn extreme_ratio_falls_back_to_float_division() {
        let t = trade(Decimal::new(1, 15), Decimal::new(100_000_000_000_000, 0));
        assert!(!t.is_dust());
        let p = t.price();
        assert!((p / 1e29 - 1.0).abs() < 1e-9, "{p}");
        assert!((t.reversed().price() * 1e29 - 1.0).abs() < 1e-9);
    }
}
