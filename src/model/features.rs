//! Feature engineering over a bar window
//!
//! Produces one feature row per bar once every indicator in the set is
//! defined: RSI, fast/slow SMA, and log returns at Fibonacci lags. Rows
//! inside the warmup prefix are dropped.

use super::indicators::{log_return, rsi, sma};
use super::Decision;
use crate::config::ModelConfig;
use crate::feed::Bar;
use chrono::{DateTime, Utc};

/// One engineered row, aligned to a bar
#[derive(Debug, Clone)]
pub struct FeatureRow {
    /// Bar timestamp
    pub timestamp: DateTime<Utc>,
    /// Bar close
    pub close: f64,
    /// RSI over the configured period
    pub rsi: f64,
    /// Fast simple moving average
    pub sma_fast: f64,
    /// Slow simple moving average
    pub sma_slow: f64,
    /// Log returns at each configured Fibonacci lag
    pub returns: Vec<f64>,
}

impl FeatureRow {
    /// Flatten into a feature vector for distance-based models
    pub fn to_vector(&self) -> Vec<f64> {
        let mut v = Vec::with_capacity(3 + self.returns.len());
        v.push(self.rsi);
        v.push(self.sma_fast);
        v.push(self.sma_slow);
        v.extend_from_slice(&self.returns);
        v
    }
}

/// First `n` distinct Fibonacci numbers, used as return lags
///
/// The leading duplicate 1 of the sequence collapses, so the lags are
/// 1, 2, 3, 5, 8, 13, 21, ...
pub fn fibonacci_lags(n: usize) -> Vec<usize> {
    let mut lags = Vec::with_capacity(n);
    let (mut a, mut b) = (1usize, 2usize);
    while lags.len() < n {
        lags.push(a);
        let next = a + b;
        a = b;
        b = next;
    }
    lags
}

/// Engineer feature rows from a chronological bar window
///
/// Rows are emitted only where RSI, both SMAs, and every lagged return
/// are defined, mirroring a dropna over the indicator columns.
pub fn feature_engineer(bars: &[Bar], config: &ModelConfig) -> Vec<FeatureRow> {
    let closes: Vec<f64> = bars
        .iter()
        .map(|b| f64::try_from(b.close).unwrap_or(0.0))
        .collect();

    let lags = fibonacci_lags(config.return_lags);
    let mut rows = Vec::new();

    for i in 0..bars.len() {
        let history = &closes[..=i];

        let Some(rsi_value) = rsi(history, config.rsi_period) else {
            continue;
        };
        let Some(fast) = sma(history, config.sma_fast) else {
            continue;
        };
        let Some(slow) = sma(history, config.sma_slow) else {
            continue;
        };

        let returns: Vec<f64> = lags
            .iter()
            .filter_map(|&lag| log_return(history, lag))
            .collect();
        if returns.len() != lags.len() {
            continue;
        }

        rows.push(FeatureRow {
            timestamp: bars[i].timestamp,
            close: closes[i],
            rsi: rsi_value,
            sma_fast: fast,
            sma_slow: slow,
            returns,
        });
    }

    rows
}

/// Label each row from the close one row earlier: a falling close labels
/// Buy, otherwise Sell. The first row has no predecessor and is dropped.
pub fn compute_labels(rows: &[FeatureRow]) -> Vec<(FeatureRow, Decision)> {
    rows.windows(2)
        .map(|pair| {
            let label = if pair[0].close > pair[1].close {
                Decision::Buy
            } else {
                Decision::Sell
            };
            (pair[1].clone(), label)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let close = Decimal::try_from(c).unwrap();
                Bar {
                    timestamp: base + Duration::minutes(i as i64),
                    symbol: "AAPL".to_string(),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 100,
                }
            })
            .collect()
    }

    fn small_config() -> ModelConfig {
        ModelConfig {
            rsi_period: 3,
            sma_fast: 3,
            sma_slow: 5,
            return_lags: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_fibonacci_lags_distinct() {
        assert_eq!(fibonacci_lags(7), vec![1, 2, 3, 5, 8, 13, 21]);
        assert_eq!(fibonacci_lags(3), vec![1, 2, 3]);
        assert!(fibonacci_lags(0).is_empty());
    }

    #[test]
    fn test_feature_engineer_warmup() {
        // Longest requirement: slow SMA of 5 and lag 3 -> first row at index 4
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let rows = feature_engineer(&bars_from_closes(&closes), &small_config());

        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].close, 104.0);
        assert_eq!(rows[0].returns.len(), 3);
    }

    #[test]
    fn test_feature_engineer_empty_window() {
        let rows = feature_engineer(&[], &small_config());
        assert!(rows.is_empty());
    }

    #[test]
    fn test_feature_engineer_values() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let rows = feature_engineer(&bars_from_closes(&closes), &small_config());

        let first = &rows[0];
        // Rising series: RSI pegged at 100, SMAs trail the close
        assert_eq!(first.rsi, 100.0);
        assert_eq!(first.sma_fast, 103.0);
        assert_eq!(first.sma_slow, 102.0);
        let expected = (104.0f64 / 103.0).ln();
        assert!((first.returns[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_to_vector_layout() {
        let row = FeatureRow {
            timestamp: Utc::now(),
            close: 100.0,
            rsi: 55.0,
            sma_fast: 99.0,
            sma_slow: 98.0,
            returns: vec![0.01, 0.02],
        };
        assert_eq!(row.to_vector(), vec![55.0, 99.0, 98.0, 0.01, 0.02]);
    }

    #[test]
    fn test_compute_labels_rule() {
        let mk = |close: f64| FeatureRow {
            timestamp: Utc::now(),
            close,
            rsi: 50.0,
            sma_fast: 0.0,
            sma_slow: 0.0,
            returns: vec![],
        };

        let rows = vec![mk(101.0), mk(100.0), mk(102.0)];
        let labeled = compute_labels(&rows);

        assert_eq!(labeled.len(), 2);
        // 101 -> 100 fell, so the second row labels Buy
        assert_eq!(labeled[0].1, Decision::Buy);
        // 100 -> 102 rose, so the third row labels Sell
        assert_eq!(labeled[1].1, Decision::Sell);
    }

    #[test]
    fn test_compute_labels_too_short() {
        assert!(compute_labels(&[]).is_empty());
    }
}
