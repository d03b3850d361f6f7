//! Configuration types for barbot

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use thiserror::Error;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub alpaca: AlpacaConfig,
    pub market: MarketConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub telemetry: TelemetryConfig,
}

/// Alpaca endpoint configuration
///
/// Credentials are never read from the file, see [`Credentials`].
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaConfig {
    /// Trading API base URL (paper by default)
    #[serde(default = "default_trading_url")]
    pub trading_url: String,
    /// Market data API base URL
    #[serde(default = "default_data_url")]
    pub data_url: String,
    /// Market data stream URL (without the feed suffix)
    #[serde(default = "default_data_stream_url")]
    pub data_stream_url: String,
    /// Trade-update stream URL
    #[serde(default = "default_trading_stream_url")]
    pub trading_stream_url: String,
    /// Data feed tier: "iex" on the free plan, "sip" with a PRO subscription
    #[serde(default = "default_feed")]
    pub feed: String,
}

fn default_trading_url() -> String {
    "https://paper-api.alpaca.markets".to_string()
}
fn default_data_url() -> String {
    "https://data.alpaca.markets".to_string()
}
fn default_data_stream_url() -> String {
    "wss://stream.data.alpaca.markets/v2".to_string()
}
fn default_trading_stream_url() -> String {
    "wss://paper-api.alpaca.markets/stream".to_string()
}
fn default_feed() -> String {
    "iex".to_string()
}

impl Default for AlpacaConfig {
    fn default() -> Self {
        Self {
            trading_url: default_trading_url(),
            data_url: default_data_url(),
            data_stream_url: default_data_stream_url(),
            trading_stream_url: default_trading_stream_url(),
            feed: default_feed(),
        }
    }
}

impl AlpacaConfig {
    /// Full websocket URL for the bar stream, e.g.
    /// `wss://stream.data.alpaca.markets/v2/iex`
    pub fn bar_stream_url(&self) -> String {
        format!("{}/{}", self.data_stream_url, self.feed)
    }
}

/// Symbols and rolling-window configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    /// Symbols to stream and trade
    pub symbols: Vec<String>,
    /// Days of minute bars to backfill before a session
    #[serde(default = "default_backfill_days")]
    pub backfill_days: u32,
    /// Maximum bars retained per symbol in the rolling store
    #[serde(default = "default_max_bars")]
    pub max_bars: usize,
}

fn default_backfill_days() -> u32 {
    5
}
fn default_max_bars() -> usize {
    10_000
}

/// Decision model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Which model makes the live decision
    #[serde(default)]
    pub kind: ModelKind,
    /// RSI lookback period
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    /// Fast simple moving average period
    #[serde(default = "default_sma_fast")]
    pub sma_fast: usize,
    /// Slow simple moving average period
    #[serde(default = "default_sma_slow")]
    pub sma_slow: usize,
    /// Number of Fibonacci return lags to engineer
    #[serde(default = "default_return_lags")]
    pub return_lags: usize,
    /// Neighbor count for the knn model
    #[serde(default = "default_k")]
    pub k: usize,
}

/// Decision model kind
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Hardcoded RSI thresholds
    #[default]
    Threshold,
    /// Nearest-neighbor classifier fit on the backfilled window
    Knn,
}

fn default_rsi_period() -> usize {
    14
}
fn default_sma_fast() -> usize {
    20
}
fn default_sma_slow() -> usize {
    50
}
fn default_return_lags() -> usize {
    7
}
fn default_k() -> usize {
    5
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::Threshold,
            rsi_period: 14,
            sma_fast: 20,
            sma_slow: 50,
            return_lags: 7,
            k: 5,
        }
    }
}

/// Backtest configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BacktestConfig {
    /// Starting cash balance per symbol
    #[serde(default = "default_starting_balance")]
    pub starting_balance: Decimal,
    /// Minimum backtest ROI required to enable live trading for a symbol
    #[serde(default = "default_min_roi")]
    pub min_roi: Decimal,
}

fn default_starting_balance() -> Decimal {
    dec!(10000)
}
fn default_min_roi() -> Decimal {
    dec!(1.03)
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            starting_balance: default_starting_balance(),
            min_roi: default_min_roi(),
        }
    }
}

/// Execution engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Execution mode
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Shares per order
    #[serde(default = "default_order_qty")]
    pub order_qty: Decimal,
    /// Decimal places for limit prices
    #[serde(default = "default_price_decimals")]
    pub price_decimals: u32,
}

/// Execution mode: paper trading or live
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Paper,
    Live,
}

fn default_order_qty() -> Decimal {
    Decimal::ONE
}
fn default_price_decimals() -> u32 {
    2
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Paper,
            order_qty: Decimal::ONE,
            price_decimals: 2,
        }
    }
}

/// Live session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Seconds between account snapshots
    #[serde(default = "default_account_poll_secs")]
    pub account_poll_secs: u64,
    /// Stop trading this many seconds before market close
    #[serde(default = "default_close_buffer_secs")]
    pub close_buffer_secs: i64,
}

fn default_account_poll_secs() -> u64 {
    60
}
fn default_close_buffer_secs() -> i64 {
    300
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            account_poll_secs: 60,
            close_buffer_secs: 300,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    pub metrics_port: u16,
    pub log_level: String,
    /// Log output format ("pretty" or "json")
    #[serde(default)]
    pub log_format: crate::telemetry::LogFormat,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// API credentials, read from the environment only
#[derive(Debug, Clone)]
pub struct Credentials {
    pub key_id: String,
    pub secret_key: String,
}

/// Credential loading errors
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// Required variable missing from the environment
    #[error("missing environment variable {0}")]
    Missing(&'static str),
}

const KEY_ID_VAR: &str = "APCA_API_KEY_ID";
const SECRET_KEY_VAR: &str = "APCA_API_SECRET_KEY";

impl Credentials {
    /// Read credentials from `APCA_API_KEY_ID` / `APCA_API_SECRET_KEY`
    pub fn from_env() -> Result<Self, CredentialsError> {
        let key_id =
            std::env::var(KEY_ID_VAR).map_err(|_| CredentialsError::Missing(KEY_ID_VAR))?;
        let secret_key =
            std::env::var(SECRET_KEY_VAR).map_err(|_| CredentialsError::Missing(SECRET_KEY_VAR))?;
        Ok(Self { key_id, secret_key })
    }
}
