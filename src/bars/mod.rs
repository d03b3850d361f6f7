//! Rolling bar store
//!
//! Thread-safe per-symbol windows of minute bars, shared between the feed
//! task and the session loop. Bounded per symbol; the oldest bar is evicted
//! once the bound is reached.

use crate::feed::Bar;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Rolling window of bars per symbol
#[derive(Clone)]
pub struct BarStore {
    data: Arc<RwLock<HashMap<String, VecDeque<Bar>>>>,
    max_bars: usize,
}

impl BarStore {
    /// Create a new store keeping at most `max_bars` bars per symbol
    pub fn new(max_bars: usize) -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            max_bars,
        }
    }

    /// Append a bar for its symbol
    ///
    /// Bars are kept in chronological order. A bar with the same timestamp
    /// as an existing one replaces it (streams re-deliver corrected bars);
    /// an out-of-order bar is inserted at its sorted position.
    pub async fn append(&self, bar: Bar) {
        let mut data = self.data.write().await;
        let window = data.entry(bar.symbol.clone()).or_default();

        match window.iter().rposition(|b| b.timestamp <= bar.timestamp) {
            Some(idx) if window[idx].timestamp == bar.timestamp => {
                window[idx] = bar;
            }
            Some(idx) if idx + 1 == window.len() => {
                window.push_back(bar);
            }
            Some(idx) => {
                window.insert(idx + 1, bar);
            }
            None => {
                window.push_front(bar);
            }
        }

        while window.len() > self.max_bars {
            window.pop_front();
        }
    }

    /// Append many bars (backfill seeding)
    pub async fn extend(&self, bars: impl IntoIterator<Item = Bar>) {
        for bar in bars {
            self.append(bar).await;
        }
    }

    /// All bars for a symbol in chronological order
    pub async fn bars(&self, symbol: &str) -> Vec<Bar> {
        let data = self.data.read().await;
        data.get(symbol)
            .map(|window| window.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of bars held for a symbol
    pub async fn len(&self, symbol: &str) -> usize {
        let data = self.data.read().await;
        data.get(symbol).map(VecDeque::len).unwrap_or(0)
    }

    /// Whether nothing at all has been stored
    pub async fn is_empty(&self) -> bool {
        let data = self.data.read().await;
        data.values().all(VecDeque::is_empty)
    }

    /// All tracked symbols
    pub async fn symbols(&self) -> Vec<String> {
        let data = self.data.read().await;
        data.keys().cloned().collect()
    }

    /// Drop everything (used when re-seeding after waiting for market open)
    pub async fn clear(&self) {
        let mut data = self.data.write().await;
        data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn bar_at(symbol: &str, minute: i64, close: rust_decimal::Decimal) -> Bar {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap();
        Bar {
            timestamp: base + Duration::minutes(minute),
            symbol: symbol.to_string(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000,
        }
    }

    #[tokio::test]
    async fn test_append_and_read() {
        let store = BarStore::new(100);
        store.append(bar_at("AAPL", 0, dec!(100))).await;
        store.append(bar_at("AAPL", 1, dec!(101))).await;

        let bars = store.bars("AAPL").await;
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, dec!(100));
        assert_eq!(bars[1].close, dec!(101));
    }

    #[tokio::test]
    async fn test_eviction_at_bound() {
        let store = BarStore::new(5);
        for i in 0..10 {
            store
                .append(bar_at("AAPL", i, dec!(100) + rust_decimal::Decimal::from(i)))
                .await;
        }

        let bars = store.bars("AAPL").await;
        assert_eq!(bars.len(), 5);
        assert_eq!(bars[0].close, dec!(105));
        assert_eq!(bars[4].close, dec!(109));
    }

    #[tokio::test]
    async fn test_duplicate_timestamp_replaces() {
        let store = BarStore::new(100);
        store.append(bar_at("AAPL", 0, dec!(100))).await;
        store.append(bar_at("AAPL", 0, dec!(99))).await;

        let bars = store.bars("AAPL").await;
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, dec!(99));
    }

    #[tokio::test]
    async fn test_out_of_order_insert() {
        let store = BarStore::new(100);
        store.append(bar_at("AAPL", 0, dec!(100))).await;
        store.append(bar_at("AAPL", 2, dec!(102))).await;
        store.append(bar_at("AAPL", 1, dec!(101))).await;

        let closes: Vec<_> = store.bars("AAPL").await.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![dec!(100), dec!(101), dec!(102)]);
    }

    #[tokio::test]
    async fn test_earliest_insert_goes_front() {
        let store = BarStore::new(100);
        store.append(bar_at("AAPL", 5, dec!(105))).await;
        store.append(bar_at("AAPL", 1, dec!(101))).await;

        let closes: Vec<_> = store.bars("AAPL").await.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![dec!(101), dec!(105)]);
    }

    #[tokio::test]
    async fn test_multiple_symbols() {
        let store = BarStore::new(100);
        store.append(bar_at("AAPL", 0, dec!(100))).await;
        store.append(bar_at("AMZN", 0, dec!(150))).await;

        let mut symbols = store.symbols().await;
        symbols.sort();
        assert_eq!(symbols, vec!["AAPL", "AMZN"]);
        assert_eq!(store.len("AAPL").await, 1);
        assert_eq!(store.len("AMZN").await, 1);
    }

    #[tokio::test]
    async fn test_extend_and_clear() {
        let store = BarStore::new(100);
        store
            .extend((0..3).map(|i| bar_at("AAPL", i, dec!(100))))
            .await;
        assert_eq!(store.len("AAPL").await, 3);

        store.clear().await;
        assert!(store.is_empty().await);
        assert_eq!(store.len("AAPL").await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_appends() {
        let store = BarStore::new(200);
        let store_clone = store.clone();

        let writer = tokio::spawn(async move {
            for i in 0..50 {
                store_clone.append(bar_at("AAPL", i, dec!(100))).await;
            }
        });

        for i in 50..100 {
            store.append(bar_at("AAPL", i, dec!(100))).await;
        }

        writer.await.unwrap();
        assert_eq!(store.len("AAPL").await, 100);
    }
}
