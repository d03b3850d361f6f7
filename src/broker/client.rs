//! Alpaca trading API client
//!
//! Account, clock, order, and position endpoints. The session calls
//! `cancel_all_orders` and `close_all_positions` on shutdown so nothing
//! is left hanging overnight.

use super::types::{Account, Clock, Order, OrderRequest, Position};
use super::BrokerError;
use crate::config::Credentials;
use reqwest::Client;
use std::time::Duration;

/// Header carrying the API key id
const KEY_HEADER: &str = "APCA-API-KEY-ID";
/// Header carrying the API secret
const SECRET_HEADER: &str = "APCA-API-SECRET-KEY";

/// Configuration for the trading client
#[derive(Debug, Clone)]
pub struct TradingClientConfig {
    /// Trading API base URL
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for TradingClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://paper-api.alpaca.markets".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Client for the Alpaca trading API
pub struct TradingClient {
    config: TradingClientConfig,
    credentials: Credentials,
    client: Client,
}

impl TradingClient {
    /// Create a new trading client against the given base URL
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self::with_config(
            TradingClientConfig {
                base_url: base_url.into(),
                ..Default::default()
            },
            credentials,
        )
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: TradingClientConfig, credentials: Credentials) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            credentials,
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2/{}", self.config.base_url, path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .header(KEY_HEADER, &self.credentials.key_id)
            .header(SECRET_HEADER, &self.credentials.secret_key)
    }

    fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .delete(self.url(path))
            .header(KEY_HEADER, &self.credentials.key_id)
            .header(SECRET_HEADER, &self.credentials.secret_key)
    }

    /// Check the response status and decode the body
    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BrokerError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BrokerError::Api { status, body });
        }
        Ok(response.json().await?)
    }

    /// Drain a response for endpoints whose body we do not need
    async fn check(response: reqwest::Response) -> Result<(), BrokerError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BrokerError::Api { status, body });
        }
        Ok(())
    }

    /// Fetch the account snapshot
    pub async fn get_account(&self) -> Result<Account, BrokerError> {
        let response = self.get("account").send().await?;
        Self::decode(response).await
    }

    /// Fetch the market clock
    pub async fn get_clock(&self) -> Result<Clock, BrokerError> {
        let response = self.get("clock").send().await?;
        Self::decode(response).await
    }

    /// Fetch all open positions
    pub async fn get_positions(&self) -> Result<Vec<Position>, BrokerError> {
        let response = self.get("positions").send().await?;
        Self::decode(response).await
    }

    /// Submit an order
    pub async fn submit_order(&self, request: &OrderRequest) -> Result<Order, BrokerError> {
        tracing::debug!(symbol = %request.symbol, side = %request.side, "Submitting order");

        let response = self
            .client
            .post(self.url("orders"))
            .header(KEY_HEADER, &self.credentials.key_id)
            .header(SECRET_HEADER, &self.credentials.secret_key)
            .json(request)
            .send()
            .await?;

        let order: Order = Self::decode(response).await?;
        tracing::info!(order_id = %order.id, symbol = %order.symbol, "Order submitted");
        Ok(order)
    }

    /// Cancel all open orders
    pub async fn cancel_all_orders(&self) -> Result<(), BrokerError> {
        let response = self.delete("orders").send().await?;
        Self::check(response).await
    }

    /// Close all open positions, cancelling their orders first
    pub async fn close_all_positions(&self) -> Result<(), BrokerError> {
        let response = self
            .delete("positions")
            .query(&[("cancel_orders", "true")])
            .send()
            .await?;
        Self::check(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> TradingClient {
        TradingClient::new(
            "https://paper-api.alpaca.markets",
            Credentials {
                key_id: "key".to_string(),
                secret_key: "secret".to_string(),
            },
        )
    }

    #[test]
    fn test_url_building() {
        let client = test_client();
        assert_eq!(
            client.url("orders"),
            "https://paper-api.alpaca.markets/v2/orders"
        );
        assert_eq!(
            client.url("clock"),
            "https://paper-api.alpaca.markets/v2/clock"
        );
    }

    #[test]
    fn test_default_config() {
        let config = TradingClientConfig::default();
        assert_eq!(config.base_url, "https://paper-api.alpaca.markets");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_request_failure_against_unroutable_host() {
        let client = TradingClient::with_config(
            TradingClientConfig {
                base_url: "http://localhost:1".to_string(),
                timeout: Duration::from_millis(200),
            },
            Credentials {
                key_id: "key".to_string(),
                secret_key: "secret".to_string(),
            },
        );

        let result = client.get_clock().await;
        assert!(matches!(result, Err(BrokerError::Http(_))));
    }
}
