//! Backtesting module
//!
//! Replays the backfilled window through the same decision model used
//! live: a linear walk over labeled feature rows, one share per trade,
//! no fees or slippage. The resulting ROI gates live trading per symbol.

mod report;
mod runner;

pub use report::SymbolReport;
pub use runner::{run_all, run_symbol, BacktestOutcome, SymbolRun};
