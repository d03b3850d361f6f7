//! Market data feed module
//!
//! Provides real-time minute bars from the Alpaca data stream

mod alpaca;
mod types;

pub use alpaca::AlpacaBarFeed;
pub use types::Bar;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Trait for bar feed implementations
#[async_trait]
pub trait BarFeed: Send + Sync {
    /// Subscribe to minute bar updates
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<Bar>>;
}
