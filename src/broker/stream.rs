//! Trade-update stream
//!
//! Listens for order lifecycle events over the trading websocket. Events
//! are observational: they are logged and forwarded, never used to build
//! local order state.

use super::types::TradeUpdate;
use crate::config::Credentials;
use crate::ws::{WsClient, WsConfig, WsMessage};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;

/// One envelope from the trading stream
#[derive(Debug, Deserialize)]
struct StreamEnvelope {
    stream: String,
    data: serde_json::Value,
}

/// Subscribes to order lifecycle events on the trading stream
pub struct TradeUpdateFeed {
    stream_url: String,
    credentials: Credentials,
}

impl TradeUpdateFeed {
    /// Create a new trade-update feed
    pub fn new(stream_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            stream_url: stream_url.into(),
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

    /// Build the listen frame for trade updates
    fn listen_frame() -> String {
        json!({
            "action": "listen",
            "data": { "streams": ["trade_updates"] },
        })
        .to_string()
    }

    /// Parse one stream payload into a trade update, if it is one
    fn parse_message(msg: &str) -> Option<TradeUpdate> {
        let envelope: StreamEnvelope = match serde_json::from_str(msg) {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unparseable trading stream payload");
                return None;
            }
        };

        match envelope.stream.as_str() {
            "trade_updates" => match serde_json::from_value(envelope.data) {
                Ok(update) => Some(update),
                Err(e) => {
                    tracing::warn!(error = %e, "Malformed trade update");
                    None
                }
            },
            "authorization" | "listening" => {
                tracing::info!(stream = %envelope.stream, "Trading stream handshake");
                None
            }
            other => {
                tracing::debug!(stream = %other, "Ignoring trading stream message");
                None
            }
        }
    }

    /// Run the message processing loop
    async fn run_message_loop(
        mut ws_rx: mpsc::Receiver<WsMessage>,
        update_tx: mpsc::Sender<TradeUpdate>,
    ) {
        while let Some(msg) = ws_rx.recv().await {
            let text = match msg {
                WsMessage::Text(text) => text,
                // The trading stream may deliver JSON as binary frames
                WsMessage::Binary(data) => match String::from_utf8(data) {
                    Ok(text) => text,
                    Err(_) => continue,
                },
                WsMessage::Connected => {
                    tracing::info!("Trade-update stream connected");
                    continue;
                }
                WsMessage::Disconnected => {
                    tracing::warn!("Trade-update stream disconnected");
                    break;
                }
                WsMessage::Reconnecting { attempt } => {
                    tracing::warn!(attempt, "Trade-update stream reconnecting...");
                    continue;
                }
            };

            if let Some(update) = Self::parse_message(&text) {
                if update_tx.send(update).await.is_err() {
                    tracing::debug!("Update receiver dropped, stopping stream");
                    break;
                }
            }
        }
    }

    /// Subscribe to trade updates
    pub async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<TradeUpdate>> {
        let (update_tx, update_rx) = mpsc::channel(256);

        tracing::info!("Subscribing to trade-status updates");

        let config = WsConfig::new(&self.stream_url)
            .on_connect(vec![self.auth_frame(), Self::listen_frame()])
            .max_reconnects(10)
            .initial_delay(Duration::from_secs(1))
            .max_delay(Duration::from_secs(60))
            .ping_interval(Duration::from_secs(30));

        let client = WsClient::new(config);
        let ws_rx = client.connect();

        tokio::spawn(async move {
            Self::run_message_loop(ws_rx, update_tx).await;
        });

        Ok(update_rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::types::TradeEvent;
    use rust_decimal_macros::dec;

    fn test_feed() -> TradeUpdateFeed {
        TradeUpdateFeed::new(
            "wss://paper-api.alpaca.markets/stream",
            Credentials {
                key_id: "key".to_string(),
                secret_key: "secret".to_string(),
            },
        )
    }

    const FILL_MSG: &str = r#"{
        "stream": "trade_updates",
        "data": {
            "event": "fill",
            "order": {
                "id": "61e69015-8549-4bfd-b9c3-01e75843f47d",
                "symbol": "AAPL",
                "side": "buy",
                "qty": "1",
                "type": "limit",
                "status": "filled",
                "limit_price": "182.40",
                "filled_at": "2024-01-02T15:05:01Z"
            }
        }
    }"#;

    #[test]
    fn test_listen_frame() {
        let v: serde_json::Value = serde_json::from_str(&TradeUpdateFeed::listen_frame()).unwrap();
        assert_eq!(v["action"], "listen");
        assert_eq!(v["data"]["streams"][0], "trade_updates");
    }

    #[test]
    fn test_auth_frame() {
        let v: serde_json::Value = serde_json::from_str(&test_feed().auth_frame()).unwrap();
        assert_eq!(v["action"], "auth");
        assert_eq!(v["key"], "key");
    }

    #[test]
    fn test_parse_fill_update() {
        let update = TradeUpdateFeed::parse_message(FILL_MSG).unwrap();
        assert_eq!(update.event, TradeEvent::Fill);
        assert_eq!(update.order.symbol, "AAPL");
        assert_eq!(update.order.limit_price, Some(dec!(182.40)));
        assert!(update.order.filled_at.is_some());
    }

    #[test]
    fn test_parse_handshake_messages() {
        let auth = r#"{"stream":"authorization","data":{"status":"authorized","action":"authenticate"}}"#;
        assert!(TradeUpdateFeed::parse_message(auth).is_none());

        let listening = r#"{"stream":"listening","data":{"streams":["trade_updates"]}}"#;
        assert!(TradeUpdateFeed::parse_message(listening).is_none());
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(TradeUpdateFeed::parse_message("not json").is_none());
    }

    #[tokio::test]
    async fn test_message_loop_forwards_updates() {
        let (ws_tx, ws_rx) = mpsc::channel(10);
        let (update_tx, mut update_rx) = mpsc::channel(10);

        let handle = tokio::spawn(async move {
            TradeUpdateFeed::run_message_loop(ws_rx, update_tx).await;
        });

        ws_tx
            .send(WsMessage::Text(FILL_MSG.to_string()))
            .await
            .unwrap();

        let update = update_rx.recv().await.unwrap();
        assert_eq!(update.event, TradeEvent::Fill);

        ws_tx.send(WsMessage::Disconnected).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_message_loop_handles_binary_frames() {
        let (ws_tx, ws_rx) = mpsc::channel(10);
        let (update_tx, mut update_rx) = mpsc::channel(10);

        let handle = tokio::spawn(async move {
            TradeUpdateFeed::run_message_loop(ws_rx, update_tx).await;
        });

        ws_tx
            .send(WsMessage::Binary(FILL_MSG.as_bytes().to_vec()))
            .await
            .unwrap();

        let update = update_rx.recv().await.unwrap();
        assert_eq!(update.order.symbol, "AAPL");

        ws_tx.send(WsMessage::Disconnected).await.unwrap();
        handle.await.unwrap();
    }
}
