//! Live execution engine
//!
//! Thin adapter routing orders through the trading REST client. Fill
//! notifications arrive on the trade-update stream, not here.

use super::{ExecutionEngine, Fill};
use crate::broker::{Order, OrderRequest, TradingClient};
use async_trait::async_trait;
use std::sync::Arc;

/// Live execution engine over the brokerage REST API
pub struct LiveEngine {
    client: Arc<TradingClient>,
}

impl LiveEngine {
    /// Create a new live engine over the given trading client
    pub fn new(client: Arc<TradingClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExecutionEngine for LiveEngine {
    async fn submit_order(&self, request: OrderRequest) -> anyhow::Result<Order> {
        let order = self.client.submit_order(&request).await?;
        Ok(order)
    }

    async fn cancel_all_orders(&self) -> anyhow::Result<()> {
        self.client.cancel_all_orders().await?;
        tracing::info!("Cancelled all open orders");
        Ok(())
    }

    async fn close_all_positions(&self) -> anyhow::Result<()> {
        self.client.close_all_positions().await?;
        tracing::info!("Closed all open positions");
        Ok(())
    }

    async fn fills(&self) -> anyhow::Result<Vec<Fill>> {
        // The broker owns live fill history; it is observed on the
        // trade-update stream instead of being mirrored here
        Ok(vec![])
    }
}
