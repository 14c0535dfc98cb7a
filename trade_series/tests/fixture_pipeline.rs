mod common;

use std::sync::Arc;

use common::*;
use trade_series::{
    SeriesEngine,
    config::load_config_str,
    rpc::{convert_values, order_history},
    sources::{
        chain::{ChainLedgerSource, MemoryChain},
        history::{HistoricTransaction, HistoryLiveSource, MemoryHistory, TxState},
    },
};

const LEDGER: &str = r#"[
  { "time": "2024-12-31T23:00:00Z", "trades": [] },
  { "time": "2025-01-01T00:30:00Z", "trades": [
      { "id": "ledger-1",
        "from": { "currency": "LTC", "amount": "10" },
        "to":   { "currency": "BTC", "amount": "20" },
        "timestamp": "2025-01-01T00:29:00Z" },
      { "from": { "currency": "LTC", "amount": "1" },
        "to":   { "currency": "BTC", "amount": "100" },
        "timestamp": "2025-01-01T00:29:00Z",
        "validity": "invalid" }
  ] },
  { "time": "2025-01-01T01:10:00Z", "unreadable": true },
  { "time": "2025-01-01T03:00:00Z", "trades": [
      { "from": { "currency": "LTC", "amount": "1" },
        "to":   { "currency": "BTC", "amount": "9" },
        "timestamp": "2025-01-01T03:00:00Z" }
  ] }
]"#;

const LIVE: &str = r#"[
  { "id": "swap-1", "state": "finished", "time": "2025-01-01T01:30:00Z",
    "from": { "currency": "LTC", "amount": "5" },
    "to":   { "currency": "BTC", "amount": "12.5" } },
  { "id": "swap-2", "state": "accepted", "time": "2025-01-01T01:40:00Z",
    "from": { "currency": "LTC", "amount": "5" },
    "to":   { "currency": "BTC", "amount": "50" } }
]"#;

fn params(raw: &[&str]) -> Vec<serde_json::Value> {
    let raw: Vec<String> = raw.iter().map(|s| s.to_string()).collect();
    convert_values(order_history::METHOD, &raw).unwrap()
}

#[test]
fn order_history_over_fixture_sources() {
    let chain: MemoryChain = serde_json::from_str(LEDGER).unwrap();
    let txs: Vec<HistoricTransaction> = serde_json::from_str(LIVE).unwrap();
    let history = MemoryHistory::from_transactions(txs);
    let cfg = load_config_str("[ledger]\npartial_policy = \"ignore\"\n").unwrap();
    let engine = SeriesEngine::with_config(
        Arc::new(ChainLedgerSource::new(chain)),
        Arc::new(HistoryLiveSource::new(history)),
        cfg,
    );

    let values = params(&["LTC", "BTC", "1735689600", "1735700400", "3600", "true"]);
    let query = order_history::query_from_params(&values, &engine.config().query).unwrap();
    let series = engine.get_aggregate_series(&query).unwrap();

    assert_eq!(series.len(), 3);
    // ledger trade is stamped with its block time; the invalid one is dropped
    assert_eq!(series[0].close, 2.0);
    assert_eq!(series[0].from_volume, dec("10"));
    assert_eq!(series[0].trade_ids.len(), 1);
    // only the finished swap counts
    assert_eq!(series[1].close, 2.5);
    assert_eq!(series[1].trade_ids.len(), 1);
    assert_eq!(series[1].trade_ids[0].as_str(), "swap-1");
    // the block at the period end is outside it
    assert!(series[2].is_empty());

    let json = serde_json::to_value(&series).unwrap();
    assert_eq!(json[0]["from_volume"], "10");
    assert_eq!(json[0]["bucket_end"], "2025-01-01T01:00:00Z");
}

#[test]
fn fail_policy_rejects_the_unreadable_block() {
    let chain: MemoryChain = serde_json::from_str(LEDGER).unwrap();
    let cfg = load_config_str("[ledger]\npartial_policy = \"fail\"\n").unwrap();
    let engine = SeriesEngine::with_config(
        Arc::new(ChainLedgerSource::new(chain)),
        Arc::new(HistoryLiveSource::new(MemoryHistory::new())),
        cfg,
    );
    let values = params(&["LTC", "BTC", "1735689600", "1735700400", "3600"]);
    let query = order_history::query_from_params(&values, &engine.config().query).unwrap();
    let err = engine.get_aggregate_series(&query).unwrap_err();
    assert!(matches!(err, trade_series::Error::PartialLedger { skipped: 1, .. }));
}

#[test]
fn history_state_changes_show_up_without_a_rebuild() {
    let history = Arc::new(HistoryLiveSource::new(MemoryHistory::from_transactions(
        serde_json::from_str(LIVE).unwrap(),
    )));
    let ledger = FakeLedger::with(vec![]);
    let engine = SeriesEngine::new(ledger.clone(), history.clone());
    let query = hourly(3, 10);

    assert_eq!(engine.get_aggregate_series(&query).unwrap()[1].close, 2.5);
    assert!(history.history().set_state("swap-2", TxState::Finished));
    let c = &engine.get_aggregate_series(&query).unwrap()[1];
    assert_eq!((c.open, c.high, c.close), (2.5, 10.0, 10.0));
    assert_eq!(ledger.calls(), 1);
}
