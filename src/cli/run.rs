//! Run command implementation

use crate::broker::TradingClient;
use crate::config::{Config, Credentials, ExecutionMode};
use crate::engine::Session;
use crate::execution::{ExecutionEngine, LiveEngine, PaperEngine};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Force paper execution regardless of configuration
    #[arg(long)]
    pub paper: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let credentials = Credentials::from_env()?;
        let trading = Arc::new(TradingClient::new(
            &config.alpaca.trading_url,
            credentials.clone(),
        ));

        let mode = if self.paper {
            ExecutionMode::Paper
        } else {
            config.execution.mode
        };
        let execution: Arc<dyn ExecutionEngine> = match mode {
            ExecutionMode::Paper => {
                tracing::info!("Starting paper trading session");
                Arc::new(PaperEngine::new())
            }
            ExecutionMode::Live => {
                tracing::info!("Starting live trading session");
                Arc::new(LiveEngine::new(trading.clone()))
            }
        };

        let session = Session::new(config, credentials, trading, execution);
        session.run().await
    }
}
