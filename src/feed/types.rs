//! Market data feed types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One OHLCV minute bar for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar start timestamp
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    /// Trading symbol (e.g., "AAPL")
    #[serde(rename = "S", default)]
    pub symbol: String,
    /// Open price
    #[serde(rename = "o")]
    pub open: Decimal,
    /// High price
    #[serde(rename = "h")]
    pub high: Decimal,
    /// Low price
    #[serde(rename = "l")]
    pub low: Decimal,
    /// Close price
    #[serde(rename = "c")]
    pub close: Decimal,
    /// Share volume
    #[serde(rename = "v")]
    pub volume: u64,
}
