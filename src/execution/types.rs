//! Execution types

use crate::broker::OrderSide;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fill recorded by the paper engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    /// Order that produced the fill
    pub order_id: Uuid,
    /// Symbol traded
    pub symbol: String,
    /// Trade side
    pub side: OrderSide,
    /// Fill price
    pub price: Decimal,
    /// Shares filled
    pub qty: Decimal,
    /// Fill timestamp
    pub timestamp: DateTime<Utc>,
}
