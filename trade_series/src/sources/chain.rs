//! Ledger source that walks a chain of blocks from the tip backwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    models::{TimePeriod, TradeRecord, Validity},
    sources::{LedgerScan, LedgerTradeSource, SourceError},
};

/// Position of a block in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    /// Height above genesis.
    pub height: u64,
    /// Block timestamp.
    pub time: DateTime<Utc>,
}

/// Read access to block storage.
pub trait BlockReader: Send + Sync {
    /// The current chain tip, `None` for an empty chain.
    fn tip(&self) -> Option<BlockRef>;
    /// The block before `block`, `None` at genesis.
    fn parent(&self, block: &BlockRef) -> Option<BlockRef>;
    /// Decode the trades recorded in `block`.
    fn read_trades(&self, block: &BlockRef) -> Result<Vec<TradeRecord>, SourceError>;
}

/// [`LedgerTradeSource`] over any [`BlockReader`].
///
/// Blocks at or after `period.end` are skipped; the walk stops at the first
/// block before `period.start`. Unreadable blocks are counted and skipped.
/// Only [`Validity::Valid`] trades are kept, each stamped with its block time.
pub struct ChainLedgerSource<R> {
    reader: R,
}

impl<R: BlockReader> ChainLedgerSource<R> {
    /// Wrap a block reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// The wrapped reader.
    pub fn reader(&self) -> &R {
        &self.reader
    }
}

impl<R: BlockReader> LedgerTradeSource for ChainLedgerSource<R> {
    fn fetch_ledger_trades(&self, period: &TimePeriod) -> Result<LedgerScan, SourceError> {
        let mut scan = LedgerScan::default();

        let mut cursor = self.reader.tip();
        while let Some(block) = cursor {
            if block.time < period.end {
                break;
            }
            cursor = self.reader.parent(&block);
        }

        let mut blocks = 0usize;
        while let Some(block) = cursor {
            if !period.contains(block.time) {
                break;
            }
            blocks += 1;
            match self.reader.read_trades(&block) {
                Ok(trades) => scan.trades.extend(
                    trades
                        .into_iter()
                        .filter(|t| t.validity == Validity::Valid)
                        .map(|mut t| {
                            t.timestamp = block.time;
                            t
                        }),
                ),
                Err(e) => {
                    warn!(height = block.height, error = %e, "skipping unreadable block");
                    scan.skipped_units += 1;
                }
            }
            cursor = self.reader.parent(&block);
        }

        // blocks were visited newest first
        scan.trades.sort_by_key(|t| t.timestamp);
        debug!(
            blocks,
            trades = scan.trades.len(),
            skipped = scan.skipped_units,
            "ledger scan finished"
        );
        Ok(scan)
    }
}

/// One block of a [`MemoryChain`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryBlock {
    /// Block time.
    pub time: DateTime<Utc>,
    /// Simulates a block that fails to read from disk.
    #[serde(default)]
    pub unreadable: bool,
    /// Trades recorded in the block.
    #[serde(default)]
    pub trades: Vec<TradeRecord>,
}

/// In-memory [`BlockReader`]; block `i` has height `i`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryChain {
    blocks: Vec<MemoryBlock>,
}

impl MemoryChain {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from blocks in height order.
    pub fn from_blocks(blocks: Vec<MemoryBlock>) -> Self {
        Self { blocks }
    }

    /// Append a readable block.
    pub fn push_block(&mut self, time: DateTime<Utc>, trades: Vec<TradeRecord>) {
        self.blocks.push(MemoryBlock {
            time,
            unreadable: false,
            trades,
        });
    }

    /// Append a block whose contents can't be read.
    pub fn push_unreadable(&mut self, time: DateTime<Utc>) {
        self.blocks.push(MemoryBlock {
            time,
            unreadable: true,
            trades: Vec::new(),
        });
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// `true` for a chain without blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn block_ref(&self, height: usize) -> Option<BlockRef> {
        self.blocks.get(height).map(|b| BlockRef {
            height: height as u64,
            time: b.time,
        })
    }
}

impl BlockReader for MemoryChain {
    fn tip(&self) -> Option<BlockRef> {
        self.blocks.len().checked_sub(1).and_then(|h| self.block_ref(h))
    }

    fn parent(&self, block: &BlockRef) -> Option<BlockRef> {
        let height = usize::try_from(block.height).ok()?;
        height.checked_sub(1).and_then(|h| self.block_ref(h))
    }

    fn read_trades(&self, block: &BlockRef) -> Result<Vec<TradeRecord>, SourceError> {
        let found = usize::try_from(block.height)
            .ok()
            .and_then(|h| self.blocks.get(h));
        match found {
            Some(b) if b.unreadable => super::CorruptSnafu {
                message: format!("block {} failed to read", block.height),
            }
            .fail(),
            Some(b) => Ok(b.trades.clone()),
            None => super::UnavailableSnafu {
                message: format!("no block at height {}", block.height),
            }
            .fail(),
        }
    }
}
