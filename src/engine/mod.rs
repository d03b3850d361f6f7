//! Live trading session
//!
//! Orchestrates one market session end to end: wait for the open,
//! backfill the rolling window, gate symbols on the backtest, then fan in
//! streamed bars and trade updates until the close buffer is reached.

use crate::backtest;
use crate::bars::BarStore;
use crate::broker::{
    MarketDataClient, OrderRequest, OrderSide, TradeEvent, TradeUpdate, TradingClient,
    TradeUpdateFeed,
};
use crate::config::{Config, Credentials};
use crate::execution::ExecutionEngine;
use crate::feed::{AlpacaBarFeed, Bar, BarFeed};
use crate::model::{feature_engineer, Decision, DecisionModel};
use crate::telemetry::{
    record_latency, set_gauge, set_symbol_gauge, GaugeMetric, LatencyMetric,
};
use chrono::{Timelike, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// One live trading session over the configured symbols
pub struct Session {
    config: Config,
    credentials: Credentials,
    trading: Arc<TradingClient>,
    data: MarketDataClient,
    store: BarStore,
    execution: Arc<dyn ExecutionEngine>,
    models: HashMap<String, DecisionModel>,
    trading_enabled: HashMap<String, bool>,
}

impl Session {
    /// Create a session from configuration and wired clients
    pub fn new(
        config: Config,
        credentials: Credentials,
        trading: Arc<TradingClient>,
        execution: Arc<dyn ExecutionEngine>,
    ) -> Self {
        let data = MarketDataClient::new(
            &config.alpaca.data_url,
            &config.alpaca.feed,
            credentials.clone(),
        );
        let store = BarStore::new(config.market.max_bars);
        let trading_enabled = config
            .market
            .symbols
            .iter()
            .map(|s| (s.clone(), false))
            .collect();

        Self {
            config,
            credentials,
            trading,
            data,
            store,
            execution,
            models: HashMap::new(),
            trading_enabled,
        }
    }

    /// Run the session to completion
    ///
    /// Blocks until the close buffer is reached or the process is
    /// interrupted, then cancels orders and flattens positions.
    pub async fn run(mut self) -> anyhow::Result<()> {
        self.wait_for_open().await?;

        // Seed the rolling window; re-done after the open wait so the
        // backtest sees the freshest history
        let backfilled = self.backfill().await?;

        // Gate live trading per symbol on the simulated ROI
        let outcome = backtest::run_all(
            &backfilled,
            &self.config.market.symbols,
            &self.config.model,
            &self.config.backtest,
        );
        for run in outcome.runs {
            tracing::info!("{}", run.report.format_table());
            self.trading_enabled
                .insert(run.report.symbol.clone(), run.report.enabled);
            self.models.insert(run.report.symbol.clone(), run.model);
        }
        set_gauge(
            GaugeMetric::EnabledSymbols,
            self.trading_enabled.values().filter(|&&e| e).count() as f64,
        );

        // Start the streams and the account monitor
        let bar_feed = AlpacaBarFeed::new(
            self.config.alpaca.bar_stream_url(),
            self.config.market.symbols.clone(),
            self.credentials.clone(),
        );
        let mut bar_rx = bar_feed.subscribe().await?;

        let update_feed = TradeUpdateFeed::new(
            &self.config.alpaca.trading_stream_url,
            self.credentials.clone(),
        );
        let mut update_rx = update_feed.subscribe().await?;

        let monitor = spawn_account_monitor(
            self.trading.clone(),
            self.config.session.account_poll_secs,
        );

        let mut close_check = tokio::time::interval(std::time::Duration::from_secs(60));
        close_check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Once the update stream closes its arm must stop polling, or the
        // drained channel would spin the loop
        let mut updates_open = true;

        tracing::info!(symbols = ?self.config.market.symbols, "Session started");

        loop {
            tokio::select! {
                bar = bar_rx.recv() => {
                    match bar {
                        Some(bar) => self.handle_bar(bar).await,
                        None => {
                            tracing::warn!("Bar feed closed, stopping session");
                            break;
                        }
                    }
                }
                update = update_rx.recv(), if updates_open => {
                    match update {
                        Some(update) => log_trade_update(&update),
                        None => {
                            tracing::warn!("Trade-update stream closed");
                            updates_open = false;
                        }
                    }
                }
                _ = close_check.tick() => {
                    if self.near_close().await {
                        tracing::info!("Close buffer reached, stopping session");
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupt received, stopping session");
                    break;
                }
            }
        }

        monitor.abort();
        self.shutdown().await
    }

    /// Sleep until the market opens, if it is not open already
    async fn wait_for_open(&self) -> anyhow::Result<()> {
        let clock = self.trading.get_clock().await?;
        if clock.is_open {
            return Ok(());
        }

        let wait = clock.next_open - clock.timestamp;
        tracing::info!(
            secs = wait.num_seconds(),
            next_open = %clock.next_open,
            "Market closed, sleeping until open"
        );
        tokio::time::sleep(wait.to_std().unwrap_or_default()).await;
        Ok(())
    }

    /// Backfill the rolling window and return the fetched bars per symbol
    async fn backfill(&self) -> anyhow::Result<HashMap<String, Vec<Bar>>> {
        let end = Utc::now();
        let start = end - chrono::Duration::days(self.config.market.backfill_days as i64);

        let started = Instant::now();
        let bars = self
            .data
            .fetch_minute_bars(&self.config.market.symbols, start, end)
            .await?;
        record_latency(LatencyMetric::Backfill, started.elapsed());

        self.store.clear().await;
        for symbol_bars in bars.values() {
            self.store.extend(symbol_bars.iter().cloned()).await;
        }
        tracing::info!("Filled rolling bars");

        Ok(bars)
    }

    /// Append a streamed bar and trade on the resulting decision
    async fn handle_bar(&self, bar: Bar) {
        let started = Instant::now();
        let symbol = bar.symbol.clone();
        let close = bar.close;

        self.store.append(bar).await;
        set_symbol_gauge(
            GaugeMetric::RollingBars,
            &symbol,
            self.store.len(&symbol).await as f64,
        );

        if !self.trading_enabled.get(&symbol).copied().unwrap_or(false) {
            tracing::debug!(symbol = %symbol, "Skipping trading (backtest gate)");
            return;
        }
        let Some(model) = self.models.get(&symbol) else {
            return;
        };

        let window = self.store.bars(&symbol).await;
        let rows = feature_engineer(&window, &self.config.model);
        let Some(latest) = rows.last() else {
            tracing::debug!(symbol = %symbol, "Indicators still warming up");
            return;
        };

        let decision = model.decide(latest);
        tracing::info!(symbol = %symbol, close = %close, decision = %decision, "Decision");
        record_latency(LatencyMetric::BarHandling, started.elapsed());

        let Some(request) = order_for_decision(&symbol, decision, close, &self.config.execution)
        else {
            return;
        };

        let submit_started = Instant::now();
        match self.execution.submit_order(request).await {
            Ok(order) => {
                record_latency(LatencyMetric::OrderSubmission, submit_started.elapsed());
                tracing::info!(order_id = %order.id, symbol = %symbol, "Order placed ({})", order.describe());
            }
            Err(e) => {
                tracing::error!(symbol = %symbol, error = %e, "Order submission failed");
            }
        }
    }

    /// Whether the session is inside the pre-close buffer
    async fn near_close(&self) -> bool {
        match self.trading.get_clock().await {
            Ok(clock) => clock.secs_to_close() < self.config.session.close_buffer_secs,
            Err(e) => {
                tracing::warn!(error = %e, "Clock fetch failed, staying in session");
                false
            }
        }
    }

    /// Cancel everything open and flatten positions
    async fn shutdown(&self) -> anyhow::Result<()> {
        tracing::info!("Stopping: cancelling orders and closing positions");
        self.execution.cancel_all_orders().await?;
        self.execution.close_all_positions().await?;

        match self.trading.get_account().await {
            Ok(account) => {
                tracing::info!(
                    equity = %account.equity,
                    cash = %account.cash,
                    "Final account snapshot"
                );
            }
            Err(e) => tracing::warn!(error = %e, "Final account fetch failed"),
        }
        Ok(())
    }
}

/// Map a decision to an order, if it trades
///
/// Limit price is the bar close rounded to the configured precision;
/// quantity and time-in-force come from configuration (day orders).
pub fn order_for_decision(
    symbol: &str,
    decision: Decision,
    close: Decimal,
    execution: &crate::config::ExecutionConfig,
) -> Option<OrderRequest> {
    let side = match decision {
        Decision::Buy => OrderSide::Buy,
        Decision::Sell => OrderSide::Sell,
        Decision::Hold => return None,
    };
    let limit_price = close.round_dp(execution.price_decimals);
    Some(OrderRequest::limit(
        symbol,
        side,
        execution.order_qty,
        limit_price,
    ))
}

/// Log an order lifecycle event the broker streamed back
fn log_trade_update(update: &TradeUpdate) {
    let order = &update.order;
    match update.event {
        TradeEvent::Fill => {
            tracing::info!(
                order_id = %order.id,
                filled_at = ?order.filled_at,
                "Order filled ({})",
                order.describe()
            );
        }
        TradeEvent::PartialFill => {
            tracing::info!(order_id = %order.id, "Order partially filled ({})", order.describe());
        }
        TradeEvent::New => {
            tracing::info!(order_id = %order.id, "Order accepted ({})", order.describe());
        }
        TradeEvent::Canceled => {
            tracing::info!(order_id = %order.id, "Order canceled ({})", order.describe());
        }
        TradeEvent::Other => {
            tracing::debug!(order_id = %order.id, status = %order.status, "Order update");
        }
    }
}

/// Poll the account on a fixed cadence, aligned to the cadence boundary
fn spawn_account_monitor(
    trading: Arc<TradingClient>,
    poll_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let poll = poll_secs.max(1);
        loop {
            // Sleep the remainder of the poll window so snapshots land just
            // after the boundary (for poll = 60, the top of the minute)
            let now = Utc::now();
            let into_window =
                (now.second() as f64 + now.nanosecond() as f64 / 1e9) % poll as f64;
            let wait = (poll as f64 - into_window).max(0.1);
            tokio::time::sleep(std::time::Duration::from_secs_f64(wait)).await;

            let started = Instant::now();
            match trading.get_account().await {
                Ok(account) => {
                    record_latency(LatencyMetric::AccountPoll, started.elapsed());
                    tracing::info!(
                        status = %account.status,
                        equity = %account.equity,
                        cash = %account.cash,
                        buying_power = %account.buying_power,
                        "Account snapshot"
                    );
                    let equity = f64::try_from(account.equity).unwrap_or(0.0);
                    let cash = f64::try_from(account.cash).unwrap_or(0.0);
                    let buying_power = f64::try_from(account.buying_power).unwrap_or(0.0);
                    set_gauge(GaugeMetric::Equity, equity);
                    set_gauge(GaugeMetric::Cash, cash);
                    set_gauge(GaugeMetric::BuyingPower, buying_power);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Account poll failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionConfig;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_for_decision_buy() {
        let request =
            order_for_decision("AAPL", Decision::Buy, dec!(182.4567), &ExecutionConfig::default())
                .unwrap();

        assert_eq!(request.symbol, "AAPL");
        assert_eq!(request.side, OrderSide::Buy);
        assert_eq!(request.qty, dec!(1));
        assert_eq!(request.limit_price, Some(dec!(182.46)));
    }

    #[test]
    fn test_order_for_decision_sell() {
        let request =
            order_for_decision("AMZN", Decision::Sell, dec!(151.1), &ExecutionConfig::default())
                .unwrap();
        assert_eq!(request.side, OrderSide::Sell);
        assert_eq!(request.limit_price, Some(dec!(151.10)));
    }

    #[test]
    fn test_order_for_decision_hold_is_none() {
        let request =
            order_for_decision("AAPL", Decision::Hold, dec!(182.4), &ExecutionConfig::default());
        assert!(request.is_none());
    }

    #[test]
    fn test_order_qty_from_config() {
        let execution = ExecutionConfig {
            order_qty: dec!(3),
            ..Default::default()
        };
        let request = order_for_decision("AAPL", Decision::Buy, dec!(10), &execution).unwrap();
        assert_eq!(request.qty, dec!(3));
    }
}
