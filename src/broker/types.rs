//! Brokerage wire types
//!
//! Field sets follow the Alpaca v2 REST schema; numeric fields arrive as
//! JSON strings and map onto `Decimal`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trading account snapshot
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub status: String,
    pub currency: String,
    pub cash: Decimal,
    pub equity: Decimal,
    pub buying_power: Decimal,
}

/// Market clock snapshot
#[derive(Debug, Clone, Deserialize)]
pub struct Clock {
    pub timestamp: DateTime<Utc>,
    pub is_open: bool,
    pub next_open: DateTime<Utc>,
    pub next_close: DateTime<Utc>,
}

impl Clock {
    /// Seconds until the next market close
    pub fn secs_to_close(&self) -> i64 {
        (self.next_close - self.timestamp).num_seconds()
    }

    /// Seconds until the next market open
    pub fn secs_to_open(&self) -> i64 {
        (self.next_open - self.timestamp).num_seconds()
    }
}

/// An open position at the broker
#[derive(Debug, Clone, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub qty: Decimal,
    pub side: String,
    pub avg_entry_price: Decimal,
    pub market_value: Option<Decimal>,
    pub unrealized_pl: Option<Decimal>,
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

/// Time in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    Day,
    Gtc,
}

/// An order to be submitted
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub qty: Decimal,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Decimal>,
}

impl OrderRequest {
    /// Build a day limit order
    pub fn limit(symbol: impl Into<String>, side: OrderSide, qty: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            qty,
            side,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Day,
            limit_price: Some(price),
        }
    }
}

/// An order as reported by the broker
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub qty: Decimal,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub status: String,
    pub limit_price: Option<Decimal>,
    pub filled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Short human-readable order description for logs
    pub fn describe(&self) -> String {
        let mut deets = format!("{} {}", self.side, self.qty);
        if self.order_type == OrderType::Limit {
            if let Some(price) = self.limit_price {
                deets.push_str(&format!(" @ {}", price));
            }
        }
        deets
    }
}

/// Order lifecycle event on the trade-update stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeEvent {
    New,
    Fill,
    PartialFill,
    Canceled,
    #[serde(other)]
    Other,
}

/// One trade-update stream message payload
#[derive(Debug, Clone, Deserialize)]
pub struct TradeUpdate {
    pub event: TradeEvent,
    pub order: Order,
}
