//! barbot: Minute-bar trading bot for Alpaca equities markets
//!
//! This library provides the core components for:
//! - Real-time minute bars from the Alpaca data stream
//! - Historical bar backfill over REST
//! - A rolling per-symbol bar store
//! - Indicator features (RSI, SMAs, Fibonacci-lag returns)
//! - Threshold and nearest-neighbor decision models
//! - A linear backtest that gates live trading per symbol
//! - Paper/live execution with day limit orders
//! - Trade-update stream observation
//! - Full observability stack

pub mod backtest;
pub mod bars;
pub mod broker;
pub mod cli;
pub mod config;
pub mod engine;
pub mod execution;
pub mod feed;
pub mod model;
pub mod telemetry;
pub mod ws;
