//! Error taxonomy of the aggregation engine.

use thiserror::Error;

use crate::{
    models::{QueryError, TimePeriod},
    sources::SourceError,
};

/// The unified error type of the aggregation engine.
#[derive(Debug, Error)]
pub enum Error {
    /// The query was rejected before any cache access.
    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    /// The ledger source failed outright while rebuilding the cache.
    #[error("Ledger source error: {0}")]
    LedgerSource(#[source] SourceError),

    /// The live source failed; a stale-only answer would misreport totals.
    #[error("Live trade source error: {0}")]
    LiveSource(#[source] SourceError),

    /// A rebuild skipped unreadable history and the policy refuses partial data.
    #[error("Ledger rebuild skipped {skipped} unreadable unit(s) in {period:?}")]
    PartialLedger {
        /// Units that could not be read.
        skipped: usize,
        /// The period being rebuilt.
        period: TimePeriod,
    },
}

/// Convenience alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;
