//! Prometheus metrics

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Historical bar backfill
    Backfill,
    /// Per-bar decision handling
    BarHandling,
    /// Order submission round trip
    OrderSubmission,
    /// Account snapshot poll
    AccountPoll,
}

impl LatencyMetric {
    fn name(self) -> &'static str {
        match self {
            LatencyMetric::Backfill => "barbot_backfill_latency_ms",
            LatencyMetric::BarHandling => "barbot_bar_handling_latency_ms",
            LatencyMetric::OrderSubmission => "barbot_order_submission_latency_ms",
            LatencyMetric::AccountPoll => "barbot_account_poll_latency_ms",
        }
    }
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Account equity
    Equity,
    /// Account buying power
    BuyingPower,
    /// Account cash
    Cash,
    /// Symbols that cleared the backtest gate
    EnabledSymbols,
    /// Bars held in the rolling store (per symbol)
    RollingBars,
}

impl GaugeMetric {
    fn name(self) -> &'static str {
        match self {
            GaugeMetric::Equity => "barbot_account_equity_usd",
            GaugeMetric::BuyingPower => "barbot_account_buying_power_usd",
            GaugeMetric::Cash => "barbot_account_cash_usd",
            GaugeMetric::EnabledSymbols => "barbot_enabled_symbols",
            GaugeMetric::RollingBars => "barbot_rolling_bars",
        }
    }
}

/// Start the Prometheus exporter on the given port
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;

    tracing::info!(%addr, "Metrics exporter listening");
    Ok(())
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    metrics::histogram!(metric.name()).record(duration.as_millis() as f64);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    metrics::gauge!(metric.name()).set(value);
}

/// Set a per-symbol gauge value
pub fn set_symbol_gauge(metric: GaugeMetric, symbol: &str, value: f64) {
    metrics::gauge!(metric.name(), "symbol" => symbol.to_string()).set(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_prefixed() {
        assert_eq!(
            LatencyMetric::BarHandling.name(),
            "barbot_bar_handling_latency_ms"
        );
        assert_eq!(GaugeMetric::Equity.name(), "barbot_account_equity_usd");
    }

    #[test]
    fn test_recording_without_exporter_is_a_noop() {
        // Without an installed recorder these must not panic
        record_latency(LatencyMetric::OrderSubmission, Duration::from_millis(12));
        set_gauge(GaugeMetric::Equity, 10_000.0);
        set_symbol_gauge(GaugeMetric::RollingBars, "AAPL", 390.0);
    }
}
