//! Alpaca WebSocket bar feed implementation
//!
//! Speaks the v2 stream protocol: an auth frame then a subscribe frame on
//! every connection, bar messages arriving as JSON arrays tagged `"T":"b"`.

use super::{Bar, BarFeed};
use crate::config::Credentials;
use crate::ws::{WsClient, WsConfig, WsMessage};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;

/// One message from the Alpaca data stream
#[derive(Debug, Deserialize)]
#[serde(tag = "T")]
enum StreamMessage {
    /// Minute bar
    #[serde(rename = "b")]
    Bar(Bar),
    /// Handshake progress ("connected", "authenticated")
    #[serde(rename = "success")]
    Success { msg: String },
    /// Protocol error
    #[serde(rename = "error")]
    Error { code: u16, msg: String },
    /// Subscription confirmation
    #[serde(rename = "subscription")]
    Subscription {
        #[serde(default)]
        bars: Vec<String>,
    },
    /// Anything else (trades, quotes, status messages we never subscribed to)
    #[serde(other)]
    Other,
}

/// Alpaca WebSocket feed for per-symbol minute bars
pub struct AlpacaBarFeed {
    stream_url: String,
    symbols: Vec<String>,
    credentials: Credentials,
}

impl AlpacaBarFeed {
    /// Create a new feed for the given symbols
    pub fn new(
        stream_url: impl Into<String>,
        symbols: Vec<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            stream_url: stream_url.into(),
            symbols,
            credentials,
        }
    }

    /// Build the auth frame sent first on every connection
    fn auth_frame(&self) -> String {
        json!({
            "action": "auth",
            "key": self.credentials.key_id,
            "secret": self.credentials.secret_key,
        })
        .to_string()
    }

    /// Build the bar subscription frame
    fn subscribe_frame(&self) -> String {
        json!({
            "action": "subscribe",
            "bars": self.symbols,
        })
        .to_string()
    }

    /// Parse one stream payload (a JSON array of tagged messages) into bars
    fn parse_message(msg: &str) -> Vec<Bar> {
        let messages: Vec<StreamMessage> = match serde_json::from_str(msg) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unparseable stream payload");
                return vec![];
            }
        };

        let mut bars = Vec::new();
        for message in messages {
            match message {
                StreamMessage::Bar(bar) => bars.push(bar),
                StreamMessage::Success { msg } => {
                    tracing::info!(status = %msg, "Data stream handshake");
                }
                StreamMessage::Error { code, msg } => {
                    tracing::error!(code, error = %msg, "Data stream error");
                }
                StreamMessage::Subscription { bars } => {
                    tracing::info!(symbols = ?bars, "Bar subscription confirmed");
                }
                StreamMessage::Other => {}
            }
        }
        bars
    }

    /// Run the message processing loop
    async fn run_message_loop(mut ws_rx: mpsc::Receiver<WsMessage>, bar_tx: mpsc::Sender<Bar>) {
        while let Some(msg) = ws_rx.recv().await {
            match msg {
                WsMessage::Text(text) => {
                    for bar in Self::parse_message(&text) {
                        if bar_tx.send(bar).await.is_err() {
                            tracing::debug!("Bar receiver dropped, stopping feed");
                            return;
                        }
                    }
                }
                WsMessage::Connected => {
                    tracing::info!("Alpaca bar feed connected");
                }
                WsMessage::Disconnected => {
                    tracing::warn!("Alpaca bar feed disconnected");
                    break;
                }
                WsMessage::Reconnecting { attempt } => {
                    tracing::warn!(attempt, "Alpaca bar feed reconnecting...");
                }
                WsMessage::Binary(_) => {
                    // The data stream is JSON-over-text
                }
            }
        }
    }
}

#[async_trait]
impl BarFeed for AlpacaBarFeed {
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<Bar>> {
        let (bar_tx, bar_rx) = mpsc::channel(1024);

        tracing::info!(symbols = ?self.symbols, "Subscribing to Alpaca bar stream");

        let config = WsConfig::new(&self.stream_url)
            .on_connect(vec![self.auth_frame(), self.subscribe_frame()])
            .max_reconnects(10)
            .initial_delay(Duration::from_secs(1))
            .max_delay(Duration::from_secs(60))
            .ping_interval(Duration::from_secs(30));

        let client = WsClient::new(config);
        let ws_rx = client.connect();

        // Spawn message processing task
        tokio::spawn(async move {
            Self::run_message_loop(ws_rx, bar_tx).await;
        });

        Ok(bar_rx)
    }
}
