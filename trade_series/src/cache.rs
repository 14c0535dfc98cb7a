//! Sparse per-pair candle store with snapshot reads and serialized rebuilds.
//!
//! Readers call [`SeriesCache::ensure_covers`], which returns an
//! `Arc<SparseStore>` snapshot that covers the requested period. Holding that
//! `Arc` for the rest of a query means the query sees exactly one store
//! generation, even if another thread installs a new one meanwhile.
//!
//! Implementation notes:
//! - Uses `arc-swap` for atomic pointer swaps + cheap reads.
//! - Rebuilds are serialized by one mutex. A thread that waited on the mutex
//!   re-checks coverage first, so a burst of identical queries rebuilds once.
//! - Invalidation is global: a rebuild replaces every pair's series, because
//!   one ledger scan yields the trades of all pairs at once. The store can't
//!   detect ledger reorganizations, so it is never patched incrementally.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::TimeDelta;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{
    bucket::bucket_end_ceil,
    config::PartialLedgerPolicy,
    errors::{Error, Result},
    models::{Candle, TimePeriod, TradeRecord},
    sources::LedgerTradeSource,
};

/// One immutable generation of the sparse store.
///
/// Maps a directed pair key (`"TO/FROM"`) to candles ascending by bucket end,
/// holding only buckets that received at least one ledger trade.
#[derive(Debug, Clone, Default)]
pub struct SparseStore {
    generation: u64,
    period: Option<TimePeriod>,
    series: IndexMap<String, Vec<Candle>>,
}

impl SparseStore {
    /// A store that covers nothing.
    pub fn empty(generation: u64) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    /// Bucket ascending `trades` into `width`-wide candles.
    ///
    /// A trade opens a new candle when its rounded-up bucket end is later than
    /// the last candle's end; otherwise it is merged into the last candle.
    /// Dust and trades outside `period` are dropped.
    pub fn build(
        generation: u64,
        period: TimePeriod,
        width: TimeDelta,
        trades: &[TradeRecord],
    ) -> Self {
        let mut series: IndexMap<String, Vec<Candle>> = IndexMap::new();
        let (mut dust, mut outside) = (0usize, 0usize);
        for trade in trades {
            if trade.is_dust() {
                dust += 1;
                continue;
            }
            if !period.contains(trade.timestamp) {
                outside += 1;
                continue;
            }
            let end = bucket_end_ceil(trade.timestamp, width);
            let candles = series.entry(trade.pair_key()).or_default();
            match candles.last_mut() {
                Some(last) if end <= last.bucket_end => last.update_from_trade(trade, true),
                _ => {
                    let mut candle =
                        Candle::empty(trade.from.currency.clone(), trade.to.currency.clone(), end);
                    candle.update_from_trade(trade, true);
                    candles.push(candle);
                }
            }
        }
        if dust > 0 || outside > 0 {
            debug!(dust, outside, "ledger trades left out of the sparse store");
        }
        Self {
            generation,
            period: Some(period),
            series,
        }
    }

    /// Monotonic id of this store generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The period this store is complete for, if any.
    pub fn period(&self) -> Option<TimePeriod> {
        self.period
    }

    /// `true` when `period` lies inside the validity period.
    pub fn covers(&self, period: &TimePeriod) -> bool {
        self.period.is_some_and(|p| p.covers(period))
    }

    /// Number of pair directions with data.
    pub fn pair_count(&self) -> usize {
        self.series.len()
    }

    /// Every cached candle for `key`.
    pub fn series(&self, key: &str) -> &[Candle] {
        self.series.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cached candles for `key` with `start < bucket_end <= end`.
    pub fn range(&self, key: &str, period: &TimePeriod) -> &[Candle] {
        let candles = self.series(key);
        let lo = candles.partition_point(|c| c.bucket_end <= period.start);
        let hi = candles.partition_point(|c| c.bucket_end <= period.end);
        &candles[lo..hi.max(lo)]
    }
}

/// Owner of the current [`SparseStore`] generation.
pub struct SeriesCache {
    store: ArcSwap<SparseStore>,
    rebuild_lock: Mutex<()>,
    width: TimeDelta,
    partial_policy: PartialLedgerPolicy,
}

impl SeriesCache {
    /// An empty cache bucketing by `width`.
    pub fn new(width: TimeDelta, partial_policy: PartialLedgerPolicy) -> Self {
        Self {
            store: ArcSwap::from_pointee(SparseStore::empty(0)),
            rebuild_lock: Mutex::new(()),
            width,
            partial_policy,
        }
    }

    /// Bucket width of the sparse store.
    pub fn width(&self) -> TimeDelta {
        self.width
    }

    /// Returns an `Arc` snapshot of the current generation.
    pub fn snapshot(&self) -> Arc<SparseStore> {
        self.store.load_full()
    }

    /// A snapshot that covers `period`, rebuilding from `ledger` if needed.
    ///
    /// The rebuild targets exactly `period`, which becomes the new validity
    /// period; the previous generation is discarded wholesale.
    pub fn ensure_covers(
        &self,
        period: &TimePeriod,
        ledger: &dyn LedgerTradeSource,
    ) -> Result<Arc<SparseStore>> {
        let snap = self.store.load_full();
        if snap.covers(period) {
            debug!(generation = snap.generation, "sparse store hit");
            return Ok(snap);
        }

        let _guard = self.rebuild_lock.lock();
        // someone may have rebuilt while we waited
        let snap = self.store.load_full();
        if snap.covers(period) {
            debug!(generation = snap.generation, "sparse store rebuilt by another query");
            return Ok(snap);
        }

        let fresh = Arc::new(self.rebuild(snap.generation + 1, period, ledger)?);
        self.store.store(Arc::clone(&fresh));
        Ok(fresh)
    }

    /// Drop every cached series; the next query rebuilds.
    pub fn invalidate(&self) {
        let _guard = self.rebuild_lock.lock();
        let next = self.store.load().generation + 1;
        self.store.store(Arc::new(SparseStore::empty(next)));
        info!(generation = next, "sparse store invalidated");
    }

    fn rebuild(
        &self,
        generation: u64,
        period: &TimePeriod,
        ledger: &dyn LedgerTradeSource,
    ) -> Result<SparseStore> {
        info!(start = %period.start, end = %period.end, generation, "rebuilding sparse store");
        let scan = ledger
            .fetch_ledger_trades(period)
            .map_err(Error::LedgerSource)?;

        if scan.is_partial() {
            match self.partial_policy {
                PartialLedgerPolicy::Ignore => {
                    debug!(skipped = scan.skipped_units, "ledger scan was partial")
                }
                PartialLedgerPolicy::Warn => warn!(
                    skipped = scan.skipped_units,
                    "ledger scan was partial, caching incomplete data"
                ),
                PartialLedgerPolicy::Fail => {
                    warn!(skipped = scan.skipped_units, "ledger scan was partial, refusing it");
                    return Err(Error::PartialLedger {
                        skipped: scan.skipped_units,
                        period: *period,
                    });
                }
            }
        }

        let store = SparseStore::build(generation, *period, self.width, &scan.trades);
        info!(
            generation,
            trades = scan.trades.len(),
            pairs = store.pair_count(),
            "sparse store rebuilt"
        );
        Ok(store)
    }
}
