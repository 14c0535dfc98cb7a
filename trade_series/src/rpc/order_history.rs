//! `dxGetOrderHistory` parameters → [`Query`].
//!
//! Positional layout, after [`super::convert_values`]:
//!
//! | pos | meaning                 | type   | default            |
//! |-----|-------------------------|--------|--------------------|
//! | 0   | from currency           | string | required           |
//! | 1   | to currency             | string | required           |
//! | 2   | start (unix seconds)    | int    | required           |
//! | 3   | end (unix seconds)      | int    | required           |
//! | 4   | granularity (seconds)   | int    | required           |
//! | 5   | include trade ids       | bool   | `false`            |
//! | 6   | include inverse         | bool   | `false`            |
//! | 7   | interval limit          | int    | config default     |
//! | 8   | invert prices           | bool   | `false`            |

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;

use crate::{
    config::QueryConfig,
    models::{Query, TimePeriod, Transform},
    rpc::RpcError,
};

/// Command name.
pub const METHOD: &str = "dxGetOrderHistory";

const REQUIRED: usize = 5;

/// Build a [`Query`] from converted parameters.
///
/// The interval limit is clamped to `cfg.max_interval_limit`. Semantic checks
/// (period order, granularity) are left to [`Query::validate`].
pub fn query_from_params(params: &[Value], cfg: &QueryConfig) -> Result<Query, RpcError> {
    if params.len() < REQUIRED {
        return Err(RpcError::Request(format!(
            "{METHOD} requires at least {REQUIRED} parameters, got {}",
            params.len()
        )));
    }

    let from = string_at(params, 0)?;
    let to = string_at(params, 1)?;
    let start = time_at(params, 2)?;
    let end = time_at(params, 3)?;
    let granularity = TimeDelta::try_seconds(int_at(params, 4)?)
        .ok_or_else(|| invalid(4, &params[4]))?;

    let include_trade_ids = opt_bool_at(params, 5)?.unwrap_or(false);
    let include_inverse = opt_bool_at(params, 6)?.unwrap_or(false);
    let limit = opt_limit_at(params, 7)?;
    let invert = opt_bool_at(params, 8)?.unwrap_or(false);

    let mut query = Query::new(
        from,
        to,
        TimePeriod::new(start, end),
        granularity,
        cfg.interval_limit(limit),
    );
    query.include_trade_ids = include_trade_ids;
    query.include_inverse = include_inverse;
    query.transform = if invert {
        Transform::Invert
    } else {
        Transform::None
    };
    Ok(query)
}

fn invalid(index: usize, value: &Value) -> RpcError {
    let raw = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    RpcError::invalid(METHOD, index, raw)
}

fn string_at(params: &[Value], index: usize) -> Result<String, RpcError> {
    match &params[index] {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        other => Err(invalid(index, other)),
    }
}

fn int_at(params: &[Value], index: usize) -> Result<i64, RpcError> {
    let value = &params[index];
    value.as_i64().ok_or_else(|| invalid(index, value))
}

fn time_at(params: &[Value], index: usize) -> Result<DateTime<Utc>, RpcError> {
    let secs = int_at(params, index)?;
    DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| invalid(index, &params[index]))
}

fn opt_bool_at(params: &[Value], index: usize) -> Result<Option<bool>, RpcError> {
    match params.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(invalid(index, other)),
    }
}

fn opt_limit_at(params: &[Value], index: usize) -> Result<Option<usize>, RpcError> {
    match params.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| invalid(index, value)),
    }
}
