//! Brokerage API module
//!
//! REST clients for the Alpaca trading and market-data APIs, plus the
//! trade-update stream. All order lifecycle state lives at the broker;
//! this module only fetches, submits, and observes.

mod client;
mod data;
mod stream;
mod types;

pub use client::TradingClient;
pub use data::MarketDataClient;
pub use stream::TradeUpdateFeed;
pub use types::{
    Account, Clock, Order, OrderRequest, OrderSide, OrderType, Position, TimeInForce, TradeEvent,
    TradeUpdate,
};

use thiserror::Error;

/// Brokerage API errors
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Transport-level failure
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success response from the API
    #[error("API error {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
}
