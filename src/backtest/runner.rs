//! Backtest runner
//!
//! One linear pass per symbol: engineer features, label rows, fit the
//! model if it learns, then walk the rows applying the decision and
//! moving one share's worth of cash per trade.

use super::SymbolReport;
use crate::config::{BacktestConfig, ModelConfig, ModelKind};
use crate::feed::Bar;
use crate::model::{
    compute_labels, feature_engineer, Decision, DecisionModel, KnnClassifier,
};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Report plus the model that produced it, reused for live decisions
#[derive(Debug)]
pub struct SymbolRun {
    pub report: SymbolReport,
    pub model: DecisionModel,
}

/// All per-symbol runs of one backtest
#[derive(Debug, Default)]
pub struct BacktestOutcome {
    pub runs: Vec<SymbolRun>,
}

impl BacktestOutcome {
    /// Symbols whose ROI cleared the gate
    pub fn enabled_symbols(&self) -> Vec<String> {
        self.runs
            .iter()
            .filter(|run| run.report.enabled)
            .map(|run| run.report.symbol.clone())
            .collect()
    }
}

/// Build the decision model for a symbol from its labeled history
fn build_model(
    labeled: &[(crate::model::FeatureRow, Decision)],
    model_config: &ModelConfig,
) -> DecisionModel {
    match model_config.kind {
        ModelKind::Threshold => DecisionModel::Threshold,
        ModelKind::Knn => {
            let mut knn = KnnClassifier::new(model_config.k);
            let features: Vec<Vec<f64>> =
                labeled.iter().map(|(row, _)| row.to_vector()).collect();
            let labels: Vec<Decision> = labeled.iter().map(|(_, label)| *label).collect();
            if let Err(e) = knn.fit(features, labels) {
                tracing::warn!(error = %e, "Falling back to threshold model");
                return DecisionModel::Threshold;
            }
            DecisionModel::Knn(knn)
        }
    }
}

/// Simulate one symbol over its backfilled bars
///
/// The walk mirrors the live path: same feature engineering, same model,
/// one share per buy/sell at the row close. Inventory is liquidated at the
/// last close and ROI compared against the configured gate.
pub fn run_symbol(
    symbol: &str,
    bars: &[Bar],
    model_config: &ModelConfig,
    backtest_config: &BacktestConfig,
) -> SymbolRun {
    let rows = feature_engineer(bars, model_config);
    let labeled = compute_labels(&rows);
    let model = build_model(&labeled, model_config);

    let starting_balance = backtest_config.starting_balance;
    let mut running_balance = starting_balance;
    let mut shares: i64 = 0;
    let (mut buys, mut sells, mut holds) = (0usize, 0usize, 0usize);
    let mut first_close: Option<Decimal> = None;
    let mut last_close = Decimal::ZERO;

    for (row, _) in &labeled {
        let close = Decimal::try_from(row.close).unwrap_or_default();
        first_close.get_or_insert(close);
        last_close = close;

        match model.decide(row) {
            Decision::Buy => {
                running_balance -= close;
                shares += 1;
                buys += 1;
            }
            Decision::Sell => {
                running_balance += close;
                shares -= 1;
                sells += 1;
            }
            Decision::Hold => holds += 1,
        }
    }

    // Final rebalance: liquidate whatever inventory is left
    let final_shares = shares;
    running_balance += Decimal::from(shares) * last_close;

    let roi = if starting_balance.is_zero() {
        Decimal::ONE
    } else {
        Decimal::ONE + (running_balance - starting_balance) / starting_balance
    };

    let hold_balance = match first_close {
        Some(first) if !first.is_zero() => starting_balance / first * last_close,
        _ => starting_balance,
    };

    let enabled = roi > backtest_config.min_roi;

    let report = SymbolReport {
        symbol: symbol.to_string(),
        starting_balance,
        ending_balance: running_balance,
        roi,
        final_shares,
        hold_balance,
        buys,
        sells,
        holds,
        rows: labeled.len(),
        enabled,
    };

    SymbolRun { report, model }
}

/// Simulate every symbol and log the resulting trading gates
pub fn run_all(
    bars_by_symbol: &HashMap<String, Vec<Bar>>,
    symbols: &[String],
    model_config: &ModelConfig,
    backtest_config: &BacktestConfig,
) -> BacktestOutcome {
    let mut outcome = BacktestOutcome::default();

    for symbol in symbols {
        let empty = Vec::new();
        let bars = bars_by_symbol.get(symbol).unwrap_or(&empty);
        let run = run_symbol(symbol, bars, model_config, backtest_config);

        tracing::info!(
            symbol = %symbol,
            roi = %run.report.roi,
            ending_balance = %run.report.ending_balance,
            "Backtest complete"
        );
        if run.report.enabled {
            tracing::info!(symbol = %symbol, "Enabling trading");
        } else {
            tracing::info!(symbol = %symbol, "Disabling trading");
        }

        outcome.runs.push(run);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let close = Decimal::try_from(c).unwrap();
                Bar {
                    timestamp: base + Duration::minutes(i as i64),
                    symbol: "TEST".to_string(),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 100,
                }
            })
            .collect()
    }

    fn small_model_config() -> ModelConfig {
        ModelConfig {
            rsi_period: 3,
            sma_fast: 3,
            sma_slow: 5,
            return_lags: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_flat_series_roi_is_flat() {
        let bars = bars_from_closes(&[100.0; 30]);
        let run = run_symbol("TEST", &bars, &small_model_config(), &BacktestConfig::default());

        // Flat closes peg RSI at 100 (zero losses), so the rule sells every
        // row and the liquidation buys it all back at the same price
        assert_eq!(run.report.ending_balance, dec!(10000));
        assert_eq!(run.report.roi, dec!(1));
        assert!(!run.report.enabled);
    }

    #[test]
    fn test_no_rows_reports_flat_roi() {
        let bars = bars_from_closes(&[100.0, 101.0]); // below warmup
        let run = run_symbol("TEST", &bars, &small_model_config(), &BacktestConfig::default());

        assert_eq!(run.report.rows, 0);
        assert_eq!(run.report.roi, dec!(1));
        assert_eq!(run.report.ending_balance, dec!(10000));
        assert!(!run.report.enabled);
    }

    #[test]
    fn test_oversold_dip_buys_and_profits() {
        // Climb through warmup, crash to drive RSI to zero, then recover:
        // the threshold rule buys the dip and the liquidation captures it.
        let mut closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        closes.extend([95.0, 90.0, 85.0, 80.0]);
        closes.extend([80.0, 120.0]);

        let run = run_symbol(
            "TEST",
            &bars_from_closes(&closes),
            &small_model_config(),
            &BacktestConfig::default(),
        );

        assert!(run.report.buys > 0);
        assert!(run.report.ending_balance > run.report.starting_balance);
    }

    #[test]
    fn test_gate_respects_min_roi() {
        let mut closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        closes.extend([95.0, 90.0, 85.0, 80.0, 80.0, 120.0]);
        let bars = bars_from_closes(&closes);

        let lenient = BacktestConfig {
            starting_balance: dec!(10000),
            min_roi: dec!(1.0),
        };
        let strict = BacktestConfig {
            starting_balance: dec!(10000),
            min_roi: dec!(100),
        };

        assert!(run_symbol("TEST", &bars, &small_model_config(), &lenient).report.enabled);
        assert!(!run_symbol("TEST", &bars, &small_model_config(), &strict).report.enabled);
    }

    #[test]
    fn test_hold_balance_benchmark() {
        let mut closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        closes.extend([95.0, 90.0, 85.0, 80.0, 80.0, 120.0]);
        let run = run_symbol(
            "TEST",
            &bars_from_closes(&closes),
            &small_model_config(),
            &BacktestConfig::default(),
        );

        // First simulated close is 105 (row after warmup plus label shift),
        // last is 120: holding should mark the start balance up by 120/105
        let expected = dec!(10000) / dec!(105) * dec!(120);
        assert_eq!(run.report.hold_balance, expected);
    }

    #[test]
    fn test_knn_kind_builds_knn_model() {
        let mut closes: Vec<f64> = (0..30).map(|i| 100.0 + (i % 7) as f64).collect();
        closes.push(150.0);

        let config = ModelConfig {
            kind: ModelKind::Knn,
            ..small_model_config()
        };
        let run = run_symbol(
            "TEST",
            &bars_from_closes(&closes),
            &config,
            &BacktestConfig::default(),
        );

        assert!(matches!(run.model, DecisionModel::Knn(_)));
    }

    #[test]
    fn test_knn_without_rows_falls_back_to_threshold() {
        let config = ModelConfig {
            kind: ModelKind::Knn,
            ..small_model_config()
        };
        let run = run_symbol(
            "TEST",
            &bars_from_closes(&[100.0, 101.0]),
            &config,
            &BacktestConfig::default(),
        );

        assert!(matches!(run.model, DecisionModel::Threshold));
    }

    #[test]
    fn test_run_all_orders_and_gates() {
        let mut by_symbol = HashMap::new();
        by_symbol.insert("AAPL".to_string(), bars_from_closes(&[100.0; 30]));
        by_symbol.insert("AMZN".to_string(), bars_from_closes(&[100.0; 30]));

        let symbols = vec!["AAPL".to_string(), "AMZN".to_string()];
        let outcome = run_all(
            &by_symbol,
            &symbols,
            &small_model_config(),
            &BacktestConfig::default(),
        );

        assert_eq!(outcome.runs.len(), 2);
        assert_eq!(outcome.runs[0].report.symbol, "AAPL");
        assert!(outcome.enabled_symbols().is_empty());
    }
}
