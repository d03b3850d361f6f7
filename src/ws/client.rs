//! WebSocket client with automatic reconnection

use super::types::{WsConfig, WsError, WsMessage};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Reusable WebSocket client with automatic reconnection and ping/pong
/// handling.
///
/// Configured on-connect frames (auth, subscribe) are sent after every
/// successful connection, so subscriptions survive reconnects.
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    /// Create a new WebSocket client with the given configuration
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    /// Get the configured URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Connect and return a receiver for messages
    ///
    /// This spawns a background task that handles connection management,
    /// automatic reconnection with exponential backoff, on-connect frame
    /// replay, and ping/pong keepalive.
    ///
    /// Returns a channel receiver that will receive all WebSocket messages
    /// including connection status events (Connected, Disconnected,
    /// Reconnecting).
    pub fn connect(&self) -> mpsc::Receiver<WsMessage> {
        let (tx, rx) = mpsc::channel(1024);
        let config = self.config.clone();

        tokio::spawn(async move {
            if let Err(e) = Self::run_connection_loop(config, tx).await {
                tracing::error!(error = %e, "WebSocket connection loop failed");
            }
        });

        rx
    }

    /// Run the connection loop with automatic reconnection
    async fn run_connection_loop(
        config: WsConfig,
        tx: mpsc::Sender<WsMessage>,
    ) -> Result<(), WsError> {
        let mut reconnect_attempts = 0;
        let mut reconnect_delay = config.initial_reconnect_delay;

        loop {
            match Self::connect_and_stream(&config, &tx).await {
                Ok(()) => {
                    tracing::info!("WebSocket connection closed cleanly");
                    let _ = tx.send(WsMessage::Disconnected).await;
                    break;
                }
                Err(e) => {
                    reconnect_attempts += 1;
                    tracing::warn!(
                        error = %e,
                        attempt = reconnect_attempts,
                        "WebSocket connection error, reconnecting..."
                    );

                    // Check max reconnects (0 = infinite)
                    if config.max_reconnect_attempts > 0
                        && reconnect_attempts >= config.max_reconnect_attempts
                    {
                        tracing::error!("Max reconnection attempts reached");
                        let _ = tx.send(WsMessage::Disconnected).await;
                        return Err(WsError::MaxReconnectsExceeded);
                    }

                    // Check if receiver is still alive
                    if tx.is_closed() {
                        tracing::info!("Receiver dropped, stopping reconnection");
                        break;
                    }

                    // Notify about reconnection attempt
                    let _ = tx
                        .send(WsMessage::Reconnecting {
                            attempt: reconnect_attempts,
                        })
                        .await;

                    sleep(reconnect_delay).await;
                    reconnect_delay = (reconnect_delay * 2).min(config.max_reconnect_delay);
                }
            }
        }

        Ok(())
    }

    /// Connect to WebSocket, send on-connect frames, and stream messages
    async fn connect_and_stream(
        config: &WsConfig,
        tx: &mpsc::Sender<WsMessage>,
    ) -> Result<(), WsError> {
        tracing::info!(url = %config.url, "Connecting to WebSocket");

        let (ws_stream, _response) = connect_async(&config.url)
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

        let (mut write, mut read) = ws_stream.split();

        // Replay the handshake frames (auth, subscribe) for this connection
        for frame in &config.on_connect {
            write
                .send(Message::Text(frame.clone()))
                .await
                .map_err(|e| WsError::SendFailed(e.to_string()))?;
        }

        tracing::info!(
            handshake_frames = config.on_connect.len(),
            "WebSocket connected"
        );

        // Notify connected
        if tx.send(WsMessage::Connected).await.is_err() {
            return Ok(());
        }

        // Setup ping interval
        let mut ping_interval = tokio::time::interval(config.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ping_interval.tick().await; // first tick fires immediately

        // Pong timeout tracking: if the previous ping was never answered by
        // the next ping tick, the connection is considered dead.
        let mut waiting_for_pong = false;

        loop {
            tokio::select! {
                // Handle incoming messages
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if tx.send(WsMessage::Text(text)).await.is_err() {
                                tracing::debug!("Receiver dropped, closing connection");
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Binary(data))) => {
                            if tx.send(WsMessage::Binary(data)).await.is_err() {
                                tracing::debug!("Receiver dropped, closing connection");
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            waiting_for_pong = false;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Received close frame");
                            return Ok(());
                        }
                        Some(Err(e)) => {
                            return Err(WsError::ConnectionFailed(e.to_string()));
                        }
                        None => {
                            return Err(WsError::ConnectionFailed("Stream ended unexpectedly".into()));
                        }
                        _ => {}
                    }
                }

                // Send periodic pings
                _ = ping_interval.tick() => {
                    if waiting_for_pong {
                        // Pong never arrived, reconnect
                        return Err(WsError::ConnectionFailed("Pong timeout".into()));
                    }
                    write.send(Message::Ping(vec![])).await
                        .map_err(|e| WsError::SendFailed(e.to_string()))?;
                    waiting_for_pong = true;
                }
            }
        }
    }
}
