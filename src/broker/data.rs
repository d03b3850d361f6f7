//! Alpaca market-data API client
//!
//! Historical minute-bar backfill used to seed the rolling window before a
//! session starts. Responses are paginated via `next_page_token`.

use super::BrokerError;
use crate::config::Credentials;
use crate::feed::Bar;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const KEY_HEADER: &str = "APCA-API-KEY-ID";
const SECRET_HEADER: &str = "APCA-API-SECRET-KEY";

/// Page size for bar requests
const PAGE_LIMIT: u32 = 10_000;

/// One page of the multi-symbol bars endpoint
#[derive(Debug, Deserialize)]
struct BarsResponse {
    #[serde(default)]
    bars: HashMap<String, Vec<Bar>>,
    next_page_token: Option<String>,
}

/// Client for the Alpaca market-data API
pub struct MarketDataClient {
    base_url: String,
    feed: String,
    credentials: Credentials,
    client: Client,
}

impl MarketDataClient {
    /// Create a new market-data client
    pub fn new(
        base_url: impl Into<String>,
        feed: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into(),
            feed: feed.into(),
            credentials,
            client,
        }
    }

    /// Fetch minute bars for the given symbols over `[start, end]`
    ///
    /// Follows `next_page_token` until the range is exhausted. Bars are
    /// returned per symbol in chronological order with the symbol field
    /// populated (the wire format omits it inside the per-symbol arrays).
    pub async fn fetch_minute_bars(
        &self,
        symbols: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<HashMap<String, Vec<Bar>>, BrokerError> {
        let url = format!("{}/v2/stocks/bars", self.base_url);
        let symbol_list = symbols.join(",");

        tracing::info!(
            symbols = %symbol_list,
            start = %start,
            end = %end,
            "Backfilling minute bars"
        );

        let mut merged: HashMap<String, Vec<Bar>> = HashMap::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut request = self
                .client
                .get(&url)
                .header(KEY_HEADER, &self.credentials.key_id)
                .header(SECRET_HEADER, &self.credentials.secret_key)
                .query(&[
                    ("symbols", symbol_list.as_str()),
                    ("timeframe", "1Min"),
                    ("feed", self.feed.as_str()),
                ])
                .query(&[("start", start.to_rfc3339()), ("end", end.to_rfc3339())])
                .query(&[("limit", PAGE_LIMIT)]);

            if let Some(ref token) = page_token {
                request = request.query(&[("page_token", token.as_str())]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(BrokerError::Api { status, body });
            }

            let page: BarsResponse = response.json().await?;
            pages += 1;
            merge_page(&mut merged, page.bars);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        let total: usize = merged.values().map(Vec::len).sum();
        tracing::info!(bars = total, pages, "Backfill complete");

        Ok(merged)
    }
}

/// Merge one response page into the accumulated per-symbol map, tagging
/// each bar with its symbol
fn merge_page(merged: &mut HashMap<String, Vec<Bar>>, page: HashMap<String, Vec<Bar>>) {
    for (symbol, bars) in page {
        let entry = merged.entry(symbol.clone()).or_default();
        for mut bar in bars {
            bar.symbol = symbol.clone();
            entry.push(bar);
        }
    }
}
