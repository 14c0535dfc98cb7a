//! Asset symbols and amounts.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An opaque asset symbol (e.g. `"BTC"`, `"LTC"`).
///
/// Two currencies are equal iff their symbols match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Wrap a symbol.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    /// The raw symbol.
    pub fn symbol(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Currency {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An amount of one currency.
///
/// The amount is an exact decimal; only prices derived from two assets are
/// floating point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Which currency.
    pub currency: Currency,
    /// How much of it.
    pub amount: Decimal,
}

impl Asset {
    /// Build an asset from a currency and an amount.
    pub fn new(currency: impl Into<Currency>, amount: Decimal) -> Self {
        Self {
            currency: currency.into(),
            amount,
        }
    }
}
