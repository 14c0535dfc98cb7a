//! Candle series aggregation over a ledger of matched trades.
//!
//! Trades are read from two sources: the ledger, which is authoritative but
//! slow, and a live feed of recent trades. Ledger trades are kept in a
//! sparse per-pair store of small candles. A query folds those candles into
//! a dense, gap-filled series at the requested granularity, then merges the
//! live trades on top.
//!
//! Entry point: [`engine::SeriesEngine::get_aggregate_series`].
#![deny(missing_docs)]

pub mod bucket;
pub mod cache;
pub mod config;
pub mod engine;
pub mod errors;
pub mod granularity;
pub mod models;
pub mod rpc;
pub mod sources;

pub use engine::SeriesEngine;
pub use errors::{Error, Result};
