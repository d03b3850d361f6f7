//! CLI interface for barbot
//!
//! Provides subcommands for:
//! - `run`: Start a live or paper trading session
//! - `backtest`: Backfill history and simulate the decision model
//! - `status`: Show account, clock, and position state
//! - `config`: Show the resolved configuration

mod backtest;
mod run;
mod status;

pub use backtest::BacktestArgs;
pub use run::RunArgs;
pub use status::StatusArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "barbot")]
#[command(about = "Minute-bar trading bot for Alpaca equities markets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a trading session
    Run(RunArgs),
    /// Run the backtest on backfilled history
    Backtest(BacktestArgs),
    /// Show account, clock, and positions
    Status(StatusArgs),
    /// Show the resolved configuration
    Config,
}
