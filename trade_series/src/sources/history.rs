//! Live source backed by the in-process transaction history.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    models::{Asset, Query, TradeId, TradeRecord, Validity},
    sources::{LiveTradeSource, SourceError},
};

/// Lifecycle state of a swap in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxState {
    /// Posted, not yet taken.
    New,
    /// Taken, settlement in progress.
    Accepted,
    /// Both sides settled.
    Finished,
    /// Abandoned or failed.
    Cancelled,
}

/// One swap as remembered by the local history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricTransaction {
    /// Swap identifier.
    pub id: String,
    /// Side given by the maker.
    pub from: Asset,
    /// Side received by the maker.
    pub to: Asset,
    /// Completion time.
    pub time: DateTime<Utc>,
    /// Current lifecycle state.
    pub state: TxState,
}

/// Anything that can enumerate recent swaps.
pub trait TransactionHistory: Send + Sync {
    /// Call `visit` once per remembered transaction, in any order.
    fn for_each_transaction(
        &self,
        visit: &mut dyn FnMut(&HistoricTransaction),
    ) -> Result<(), SourceError>;
}

/// [`LiveTradeSource`] that filters a [`TransactionHistory`].
pub struct HistoryLiveSource<H> {
    history: H,
}

impl<H: TransactionHistory> HistoryLiveSource<H> {
    /// Wrap a history.
    pub fn new(history: H) -> Self {
        Self { history }
    }

    /// The wrapped history.
    pub fn history(&self) -> &H {
        &self.history
    }
}

/// The live filter: finished, inside the period, on the pair, not dust.
fn match_transaction(tx: &HistoricTransaction, query: &Query) -> Option<TradeRecord> {
    if tx.state != TxState::Finished {
        return None;
    }
    if !query.period.contains(tx.time) {
        return None;
    }
    if !query.matches_pair(&tx.from.currency, &tx.to.currency) {
        return None;
    }
    let record = TradeRecord {
        id: query.include_trade_ids.then(|| TradeId::new(tx.id.clone())),
        from: tx.from.clone(),
        to: tx.to.clone(),
        timestamp: tx.time,
        validity: Validity::Valid,
    };
    (!record.is_dust()).then_some(record)
}

impl<H: TransactionHistory> LiveTradeSource for HistoryLiveSource<H> {
    fn fetch_live_trades(&self, query: &Query) -> Result<Vec<TradeRecord>, SourceError> {
        let mut matches = Vec::new();
        self.history.for_each_transaction(&mut |tx| {
            if let Some(record) = match_transaction(tx, query) {
                matches.push(record);
            }
        })?;
        matches.sort_by_key(|r| r.timestamp);
        Ok(matches)
    }
}

/// Thread-safe in-memory [`TransactionHistory`].
#[derive(Debug, Default)]
pub struct MemoryHistory {
    txs: RwLock<Vec<HistoricTransaction>>,
}

impl MemoryHistory {
    /// An empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a list.
    pub fn from_transactions(txs: Vec<HistoricTransaction>) -> Self {
        Self {
            txs: RwLock::new(txs),
        }
    }

    /// Remember a transaction.
    pub fn record(&self, tx: HistoricTransaction) {
        self.txs.write().push(tx);
    }

    /// Move a transaction to `state`. Returns `false` if the id is unknown.
    pub fn set_state(&self, id: &str, state: TxState) -> bool {
        let mut txs = self.txs.write();
        match txs.iter_mut().find(|t| t.id == id) {
            Some(tx) => {
                tx.state = state;
                true
            }
            None => false,
        }
    }

    /// Forget everything, e.g. once the ledger has caught up.
    pub fn clear(&self) {
        self.txs.write().clear();
    }
}

impl TransactionHistory for MemoryHistory {
    fn for_each_transaction(
        &self,
        visit: &mut dyn FnMut(&HistoricTransaction),
    ) -> Result<(), SourceError> {
        self.txs.read().iter().for_each(|tx| visit(tx));
        Ok(())
    }
}
