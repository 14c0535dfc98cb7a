//! Trade source abstraction.
//!
//! The engine reads trades from two collaborators:
//!
//! - a [`LedgerTradeSource`]: slow, authoritative history (a chain scan),
//!   asked for every trade in a period when the sparse store is rebuilt;
//! - a [`LiveTradeSource`]: fast, volatile, recently completed trades that
//!   have not reached the ledger yet, asked on every query.
//!
//! Both are synchronous and must return trades sorted ascending by time.
//! Production wiring passes real implementations; tests pass fakes.
//!
//! # Example
//!
//! ```rust
//! use trade_series::models::{Query, TimePeriod, TradeRecord};
//! use trade_series::sources::{LedgerScan, LedgerTradeSource, LiveTradeSource, SourceError};
//!
//! struct Nothing;
//!
//! impl LedgerTradeSource for Nothing {
//!     fn fetch_ledger_trades(&self, _period: &TimePeriod) -> Result<LedgerScan, SourceError> {
//!         Ok(LedgerScan::default())
//!     }
//! }
//!
//! impl LiveTradeSource for Nothing {
//!     fn fetch_live_trades(&self, _query: &Query) -> Result<Vec<TradeRecord>, SourceError> {
//!         Ok(vec![])
//!     }
//! }
//! ```

pub mod chain;
pub mod history;

use snafu::{Backtrace, Snafu};

use crate::models::{Query, TimePeriod, TradeRecord};

/// Result of a ledger scan.
///
/// Unreadable history units (blocks) are skipped rather than failing the
/// scan; `skipped_units` says how many.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerScan {
    /// Trades inside the period, ascending by timestamp.
    pub trades: Vec<TradeRecord>,
    /// History units that could not be read.
    pub skipped_units: usize,
}

impl LedgerScan {
    /// `true` when some history could not be read.
    pub fn is_partial(&self) -> bool {
        self.skipped_units > 0
    }
}

/// Authoritative historical trades.
pub trait LedgerTradeSource: Send + Sync {
    /// Every trade strictly within `period`, ascending by timestamp.
    fn fetch_ledger_trades(&self, period: &TimePeriod) -> Result<LedgerScan, SourceError>;
}

/// Recent trades not yet on the ledger.
pub trait LiveTradeSource: Send + Sync {
    /// Trades on the query's pair (either direction) inside its period,
    /// without dust, ascending by timestamp.
    fn fetch_live_trades(&self, query: &Query) -> Result<Vec<TradeRecord>, SourceError>;
}

/// Errors that can occur inside a trade source.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SourceError {
    /// The backing store could not be reached at all.
    #[snafu(display("trade source unavailable: {message}"))]
    Unavailable {
        /// What was unavailable.
        message: String,
        /// Captured at construction.
        backtrace: Backtrace,
    },

    /// Data was read but could not be decoded.
    #[snafu(display("corrupt trade data: {message}"))]
    Corrupt {
        /// What was wrong with it.
        message: String,
        /// Captured at construction.
        backtrace: Backtrace,
    },

    /// Anything else inside the source.
    #[snafu(display("internal trade source error: {message}"))]
    Internal {
        /// Description.
        message: String,
        /// Captured at construction.
        backtrace: Backtrace,
    },
}
