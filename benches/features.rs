//! Benchmarks for feature engineering

use barbot::config::ModelConfig;
use barbot::feed::Bar;
use barbot::model::{feature_engineer, rsi};
use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;

fn synthetic_bars(n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close =
                Decimal::try_from(100.0 + (i as f64 * 0.7).sin() * 5.0).unwrap();
            Bar {
                timestamp: base + Duration::minutes(i as i64),
                symbol: "AAPL".to_string(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            }
        })
        .collect()
}

fn benchmark_feature_engineer(c: &mut Criterion) {
    let bars = synthetic_bars(1000);
    let config = ModelConfig::default();

    c.bench_function("feature_engineer_1000_bars", |b| {
        b.iter(|| feature_engineer(black_box(&bars), black_box(&config)))
    });
}

fn benchmark_rsi(c: &mut Criterion) {
    let closes: Vec<f64> = (0..1000).map(|i| 100.0 + (i as f64 * 0.7).sin()).collect();

    c.bench_function("rsi_14", |b| b.iter(|| rsi(black_box(&closes), 14)));
}

criterion_group!(benches, benchmark_feature_engineer, benchmark_rsi);
criterion_main!(benches);
