//! Value types shared by the cache, the engine and the trade sources.

pub mod candle;
pub mod currency;
pub mod period;
pub mod query;
pub mod trade;

pub use candle::Candle;
pub use currency::{Asset, Currency};
pub use period::TimePeriod;
pub use query::{Query, QueryError, Transform};
pub use trade::{DUST_EPSILON, TradeId, TradeRecord, Validity};
