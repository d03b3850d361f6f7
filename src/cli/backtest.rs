//! Backtest command implementation

use crate::backtest;
use crate::broker::MarketDataClient;
use crate::config::{Config, Credentials, ModelKind};
use crate::model::DecisionModel;
use chrono::Utc;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct BacktestArgs {
    /// Days of minute bars to backfill (defaults to the configured value)
    #[arg(long)]
    pub days: Option<u32>,

    /// Symbols to simulate (defaults to the configured list)
    #[arg(long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Directory to write fitted knn models into (one JSON file per symbol)
    #[arg(long)]
    pub save_models: Option<PathBuf>,
}

impl BacktestArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let credentials = Credentials::from_env()?;
        let data = MarketDataClient::new(
            &config.alpaca.data_url,
            &config.alpaca.feed,
            credentials,
        );

        let symbols = if self.symbols.is_empty() {
            config.market.symbols.clone()
        } else {
            self.symbols.clone()
        };
        let days = self.days.unwrap_or(config.market.backfill_days);

        let end = Utc::now();
        let start = end - chrono::Duration::days(days as i64);
        let bars = data.fetch_minute_bars(&symbols, start, end).await?;

        let outcome = backtest::run_all(&bars, &symbols, &config.model, &config.backtest);
        for run in &outcome.runs {
            println!("{}", run.report.format_table());
        }

        if let Some(ref dir) = self.save_models {
            if config.model.kind != ModelKind::Knn {
                tracing::warn!("Model saving requested but the configured model does not learn");
            } else {
                std::fs::create_dir_all(dir)?;
                for run in &outcome.runs {
                    if let DecisionModel::Knn(ref model) = run.model {
                        let path = dir.join(format!("{}.json", run.report.symbol));
                        model.save(&path)?;
                        tracing::info!(path = %path.display(), "Saved model");
                    }
                }
            }
        }

        Ok(())
    }
}
