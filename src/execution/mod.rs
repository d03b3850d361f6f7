//! Execution engine module
//!
//! Handles order submission (paper and live modes)

mod live;
mod paper;
mod types;

pub use live::LiveEngine;
pub use paper::PaperEngine;
pub use types::Fill;

use crate::broker::{Order, OrderRequest};
use async_trait::async_trait;

/// Trait for execution engine implementations
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Submit an order, returning it as acknowledged
    async fn submit_order(&self, request: OrderRequest) -> anyhow::Result<Order>;
    /// Cancel all open orders
    async fn cancel_all_orders(&self) -> anyhow::Result<()>;
    /// Close all open positions, cancelling their orders first
    async fn close_all_positions(&self) -> anyhow::Result<()>;
    /// Locally recorded fills (paper mode; live fills arrive on the
    /// trade-update stream and are not tracked here)
    async fn fills(&self) -> anyhow::Result<Vec<Fill>>;
}
