//! Paper trading execution engine

use super::{ExecutionEngine, Fill};
use crate::broker::{Order, OrderRequest};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Paper trading execution engine with simulated fills
///
/// Every order fills immediately at its limit price (or at zero for a
/// market order with no price attached, which the bot never submits).
pub struct PaperEngine {
    fills: Arc<RwLock<Vec<Fill>>>,
}

impl PaperEngine {
    /// Create a new paper trading engine
    pub fn new() -> Self {
        Self {
            fills: Arc::new(RwLock::new(vec![])),
        }
    }
}

impl Default for PaperEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionEngine for PaperEngine {
    async fn submit_order(&self, request: OrderRequest) -> anyhow::Result<Order> {
        let order_id = Uuid::new_v4();
        let price = request.limit_price.unwrap_or(Decimal::ZERO);
        let now = Utc::now();

        let fill = Fill {
            order_id,
            symbol: request.symbol.clone(),
            side: request.side,
            price,
            qty: request.qty,
            timestamp: now,
        };

        let mut fills = self.fills.write().await;
        fills.push(fill);

        tracing::info!(%order_id, symbol = %request.symbol, side = %request.side, "Paper order filled");

        Ok(Order {
            id: order_id,
            symbol: request.symbol,
            side: request.side,
            qty: request.qty,
            order_type: request.order_type,
            status: "filled".to_string(),
            limit_price: request.limit_price,
            filled_at: Some(now),
        })
    }

    async fn cancel_all_orders(&self) -> anyhow::Result<()> {
        tracing::info!("Paper orders cancelled");
        Ok(())
    }

    async fn close_all_positions(&self) -> anyhow::Result<()> {
        tracing::info!("Paper positions closed");
        Ok(())
    }

    async fn fills(&self) -> anyhow::Result<Vec<Fill>> {
        let fills = self.fills.read().await;
        Ok(fills.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::OrderSide;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_paper_engine_fill() {
        let engine = PaperEngine::new();

        let request = OrderRequest::limit("AAPL", OrderSide::Buy, dec!(1), dec!(182.40));
        let order = engine.submit_order(request).await.unwrap();

        assert_eq!(order.status, "filled");
        assert!(order.filled_at.is_some());

        let fills = engine.fills().await.unwrap();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].order_id, order.id);
        assert_eq!(fills[0].price, dec!(182.40));
    }

    #[tokio::test]
    async fn test_paper_engine_multiple_orders() {
        let engine = PaperEngine::new();

        engine
            .submit_order(OrderRequest::limit("AAPL", OrderSide::Buy, dec!(1), dec!(182.40)))
            .await
            .unwrap();
        engine
            .submit_order(OrderRequest::limit("AMZN", OrderSide::Sell, dec!(1), dec!(151.10)))
            .await
            .unwrap();

        let fills = engine.fills().await.unwrap();
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].side, OrderSide::Buy);
        assert_eq!(fills[1].side, OrderSide::Sell);
    }

    #[tokio::test]
    async fn test_paper_engine_cancel_and_close_are_noops() {
        let engine = PaperEngine::new();
        assert!(engine.cancel_all_orders().await.is_ok());
        assert!(engine.close_all_positions().await.is_ok());
        assert!(engine.fills().await.unwrap().is_empty());
    }
}
