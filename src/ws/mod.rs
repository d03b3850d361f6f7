//! WebSocket client library
//!
//! Provides a reusable WebSocket client with automatic reconnection,
//! ping/pong handling, configurable backoff, and on-connect frame replay
//! for endpoints that require an auth handshake on every connection.

mod client;
mod types;

pub use client::WsClient;
pub use types::{WsConfig, WsError, WsMessage};
