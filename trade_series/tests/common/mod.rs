#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use trade_series::{
    SeriesEngine,
    config::{EngineConfig, PartialLedgerPolicy},
    models::{Asset, Query, TimePeriod, TradeRecord},
    sources::{
        LedgerScan, LedgerTradeSource, LiveTradeSource, SourceError, UnavailableSnafu,
    },
};

/// Hour-aligned reference instant.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

pub fn at(minutes: i64) -> DateTime<Utc> {
    t0() + TimeDelta::minutes(minutes)
}

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

pub fn trade_at_secs(
    from: &str,
    from_amt: &str,
    to: &str,
    to_amt: &str,
    secs: i64,
) -> TradeRecord {
    TradeRecord::new(
        Asset::new(from, dec(from_amt)),
        Asset::new(to, dec(to_amt)),
        t0() + TimeDelta::seconds(secs),
    )
}

pub fn trade(from: &str, from_amt: &str, to: &str, to_amt: &str, minutes: i64) -> TradeRecord {
    TradeRecord::new(
        Asset::new(from, dec(from_amt)),
        Asset::new(to, dec(to_amt)),
        at(minutes),
    )
}

/// LTC priced in BTC, hourly, over `hours` hours from t0.
pub fn hourly(hours: i64, cap: usize) -> Query {
    Query::new(
        "LTC",
        "BTC",
        TimePeriod::new(t0(), t0() + TimeDelta::hours(hours)),
        TimeDelta::hours(1),
        cap,
    )
}

/// Ledger fake that filters its trades by period and counts scans.
#[derive(Default)]
pub struct FakeLedger {
    pub trades: Mutex<Vec<TradeRecord>>,
    pub skipped: AtomicUsize,
    pub fail: Mutex<bool>,
    pub calls: AtomicUsize,
}

impl FakeLedger {
    pub fn with(trades: Vec<TradeRecord>) -> Arc<Self> {
        Arc::new(Self {
            trades: Mutex::new(trades),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LedgerTradeSource for FakeLedger {
    fn fetch_ledger_trades(&self, period: &TimePeriod) -> Result<LedgerScan, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail.lock() {
            return UnavailableSnafu { message: "ledger offline" }.fail();
        }
        let mut trades: Vec<_> = self
            .trades
            .lock()
            .iter()
            .filter(|t| period.contains(t.timestamp))
            .cloned()
            .collect();
        trades.sort_by_key(|t| t.timestamp);
        Ok(LedgerScan {
            trades,
            skipped_units: self.skipped.load(Ordering::SeqCst),
        })
    }
}

/// Live fake that returns its records unfiltered and remembers the query.
#[derive(Default)]
pub struct FakeLive {
    pub records: Mutex<Vec<TradeRecord>>,
    pub fail: Mutex<bool>,
    pub calls: AtomicUsize,
    pub last_query: Mutex<Option<Query>>,
}

impl FakeLive {
    pub fn with(records: Vec<TradeRecord>) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(records),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LiveTradeSource for FakeLive {
    fn fetch_live_trades(&self, query: &Query) -> Result<Vec<TradeRecord>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock() = Some(query.clone());
        if *self.fail.lock() {
            return UnavailableSnafu { message: "live feed offline" }.fail();
        }
        Ok(self.records.lock().clone())
    }
}

pub fn engine(ledger: &Arc<FakeLedger>, live: &Arc<FakeLive>) -> SeriesEngine {
    SeriesEngine::new(ledger.clone(), live.clone())
}

pub fn engine_with_policy(
    ledger: &Arc<FakeLedger>,
    live: &Arc<FakeLive>,
    policy: PartialLedgerPolicy,
) -> SeriesEngine {
    let mut cfg = EngineConfig::default();
    cfg.ledger.partial_policy = policy;
    SeriesEngine::with_config(ledger.clone(), live.clone(), cfg)
}
