//! Dense series construction and live reconciliation.
//!
//! [`SeriesEngine::get_aggregate_series`] is the only way callers see candle
//! data. One call:
//!
//! 1. validates the query and bounds it to the newest `max_intervals` buckets;
//! 2. allocates a dense, gap-filled series of empty candles;
//! 3. makes sure the sparse store covers the effective period and folds the
//!    cached candles of the pair (and optionally its inverse) into the series;
//! 4. merges trades from the live source that have not reached the ledger.

use std::{borrow::Cow, sync::Arc};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};

use crate::{
    bucket::{bucket_end_ceil, dense_index},
    cache::{SeriesCache, SparseStore},
    config::EngineConfig,
    errors::{Error, Result},
    models::{Candle, Currency, Query, TimePeriod, TradeRecord, Transform},
    sources::{LedgerTradeSource, LiveTradeSource},
};

/// Aggregation engine over a ledger and a live trade source.
///
/// Safe to share between threads; queries only block each other while the
/// sparse store is being rebuilt.
pub struct SeriesEngine {
    cache: SeriesCache,
    ledger: Arc<dyn LedgerTradeSource>,
    live: Arc<dyn LiveTradeSource>,
    config: EngineConfig,
}

impl SeriesEngine {
    /// An engine with the default configuration.
    pub fn new(ledger: Arc<dyn LedgerTradeSource>, live: Arc<dyn LiveTradeSource>) -> Self {
        Self::with_config(ledger, live, EngineConfig::default())
    }

    /// An engine with an explicit configuration.
    pub fn with_config(
        ledger: Arc<dyn LedgerTradeSource>,
        live: Arc<dyn LiveTradeSource>,
        config: EngineConfig,
    ) -> Self {
        let cache = SeriesCache::new(
            config.cache.granularity.as_duration(),
            config.ledger.partial_policy,
        );
        Self {
            cache,
            ledger,
            live,
            config,
        }
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current sparse store generation.
    pub fn cache_snapshot(&self) -> Arc<SparseStore> {
        self.cache.snapshot()
    }

    /// Drop the whole sparse store. The next query rebuilds it.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    /// Build the candle series described by `query`.
    ///
    /// Returns at most `query.max_intervals` candles, ascending by bucket end,
    /// the last one ending at `query.period.end`. A period shorter than one
    /// granularity yields an empty series.
    pub fn get_aggregate_series(&self, query: &Query) -> Result<Vec<Candle>> {
        if let Err(err) = query.validate() {
            warn!(%err, "rejected query");
            return Err(Error::InvalidQuery(err));
        }

        let n = query.num_intervals();
        if n == 0 {
            debug!("period shorter than one granularity");
            return Ok(Vec::new());
        }

        let period = query.effective_period();
        let (from, to) = query.series_direction();
        let mut series = allocate_dense(&from, &to, period.start, query.granularity, n);

        let width = self.cache.width();
        if query.granularity.num_seconds() % width.num_seconds().max(1) != 0 {
            warn!(
                granularity = query.granularity.num_seconds(),
                cache_width = width.num_seconds(),
                "granularity is not a multiple of the cache bucket width"
            );
        }

        // the fold reads this one generation even if a rebuild lands meanwhile
        let store = self.cache.ensure_covers(&period, self.ledger.as_ref())?;
        // a cached bucket straddling an unaligned end still holds trades before it
        let fold_window = TimePeriod::new(period.start, bucket_end_ceil(period.end, width));
        let mut folded = fold_cached(
            &mut series,
            store.range(&query.forward_key(), &fold_window),
            period.start,
            query.granularity,
            query.transform,
            query.include_trade_ids,
        );
        if query.include_inverse {
            folded += fold_cached(
                &mut series,
                store.range(&query.inverse_key(), &fold_window),
                period.start,
                query.granularity,
                query.transform.flip(),
                query.include_trade_ids,
            );
        }

        let live = self
            .live
            .fetch_live_trades(&query.truncated())
            .map_err(Error::LiveSource)?;
        let merged = merge_live(&mut series, &live, &period, query, query.include_trade_ids);

        debug!(
            intervals = n,
            generation = store.generation(),
            folded,
            live = merged,
            "series built"
        );
        Ok(series)
    }
}

fn allocate_dense(
    from: &Currency,
    to: &Currency,
    start: DateTime<Utc>,
    granularity: TimeDelta,
    n: usize,
) -> Vec<Candle> {
    let mut series = Vec::with_capacity(n);
    let mut end = start;
    for _ in 0..n {
        end += granularity;
        series.push(Candle::empty(from.clone(), to.clone(), end));
    }
    series
}

/// Merge cached candles into their dense slots; returns how many landed.
///
/// Candles ending past the last dense bucket go into the last one.
fn fold_cached(
    series: &mut [Candle],
    cached: &[Candle],
    start: DateTime<Utc>,
    granularity: TimeDelta,
    transform: Transform,
    include_trade_ids: bool,
) -> usize {
    let Some(last) = series.len().checked_sub(1) else {
        return 0;
    };
    let mut folded = 0;
    for candle in cached {
        let Some(slot) = dense_index(candle.bucket_end, start, granularity)
            .and_then(|i| series.get_mut(i.min(last)))
        else {
            continue;
        };
        match transform {
            Transform::None => slot.update_from_candle(candle, include_trade_ids),
            Transform::Invert => slot.update_from_candle(&candle.inverse(), include_trade_ids),
        }
        folded += 1;
    }
    folded
}

/// Forward-only merge of ascending live records; returns how many landed.
///
/// Each record goes into the first candle ending strictly after it. Records
/// are turned around to the series direction first.
fn merge_live(
    series: &mut [Candle],
    records: &[TradeRecord],
    period: &TimePeriod,
    query: &Query,
    include_trade_ids: bool,
) -> usize {
    let Some(series_from) = series.first().map(|c| c.from_currency.clone()) else {
        return 0;
    };
    let mut cursor = 0;
    let mut merged = 0;
    for record in records {
        if record.is_dust()
            || !period.contains(record.timestamp)
            || !query.matches_pair(&record.from.currency, &record.to.currency)
        {
            continue;
        }
        let oriented = if record.from.currency == series_from {
            Cow::Borrowed(record)
        } else {
            Cow::Owned(record.reversed())
        };
        while cursor < series.len() && series[cursor].bucket_end <= record.timestamp {
            cursor += 1;
        }
        let Some(slot) = series.get_mut(cursor) else {
            break;
        };
        slot.update_from_trade(&oriented, include_trade_ids);
        merged += 1;
    }
    merged
}
