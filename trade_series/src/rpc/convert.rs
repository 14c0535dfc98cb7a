//! Positional string → JSON parameter conversion.

use serde_json::Value;
use tracing::warn;

use crate::rpc::RpcError;

/// A parameter position that is parsed as JSON instead of kept as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertParam {
    /// Command name.
    pub method: &'static str,
    /// Zero-based position.
    pub index: usize,
}

const fn p(method: &'static str, index: usize) -> ConvertParam {
    ConvertParam { method, index }
}

/// Positions of typed parameters, per command.
pub static CONVERT_TABLE: &[ConvertParam] = &[
    p("dxGetOrderHistory", 2),
    p("dxGetOrderHistory", 3),
    p("dxGetOrderHistory", 4),
    p("dxGetOrderHistory", 5),
    p("dxGetOrderHistory", 6),
    p("dxGetOrderHistory", 7),
    p("dxGetOrderHistory", 8),
    p("dxGetOrderBook", 0),
    p("dxGetOrderBook", 3),
    p("dxGetOrderBook", 4),
    p("dxFlushCancelledOrders", 0),
    p("dxFlushCancelledOrders", 1),
    p("gettradingdata", 0),
    p("gettradingdata", 1),
    p("xrGetBlockCount", 1),
    p("xrGetBlockHash", 2),
    p("xrGetBlock", 2),
    p("xrGetBlocks", 2),
    p("xrGetTransaction", 2),
    p("xrGetTransactions", 2),
    p("xrDecodeRawTransaction", 2),
    p("xrSendTransaction", 2),
    p("xrServiceConsensus", 0),
    p("xrUpdateConfigs", 0),
    p("xrGetBalance", 2),
    p("xrGetTxBloomFilter", 2),
    p("xrGetTxBloomFilter", 3),
    p("xrGetBlockAtTime", 1),
    p("xrGetBlockAtTime", 2),
    p("xrConnect", 1),
];

/// `true` if position `index` of `method` is typed.
pub fn is_converted(method: &str, index: usize) -> bool {
    CONVERT_TABLE
        .iter()
        .any(|c| c.method == method && c.index == index)
}

/// Convert raw parameters of `method`.
///
/// Typed positions must hold a JSON value (number, boolean, object, array,
/// quoted string, `null`); every other position is passed through as a JSON
/// string.
pub fn convert_values(method: &str, params: &[String]) -> Result<Vec<Value>, RpcError> {
    params
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            if !is_converted(method, index) {
                return Ok(Value::String(raw.clone()));
            }
            serde_json::from_str::<Value>(raw).map_err(|err| {
                warn!(method, index, %err, "unparseable parameter");
                RpcError::invalid(method, index, raw.as_str())
            })
        })
        .collect()
}
