use barbot::cli::{Cli, Commands};
use barbot::config::Config;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Credentials may live in a .env next to the config
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        toml::from_str(include_str!("../config.toml.example")).expect("Invalid default config")
    });

    // Initialize telemetry
    barbot::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            args.execute(config).await?;
        }
        Commands::Backtest(args) => {
            tracing::info!("Starting backtest");
            args.execute(config).await?;
        }
        Commands::Status(args) => {
            args.execute(config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Symbols: {}", config.market.symbols.join(", "));
            println!(
                "  Backfill: {} days, {} bars retained",
                config.market.backfill_days, config.market.max_bars
            );
            println!(
                "  Model: {:?} (RSI {}, SMA {}/{})",
                config.model.kind,
                config.model.rsi_period,
                config.model.sma_fast,
                config.model.sma_slow
            );
            println!(
                "  Gate: ROI > {} on ${}",
                config.backtest.min_roi, config.backtest.starting_balance
            );
            println!(
                "  Execution: {:?}, {} share(s) per order",
                config.execution.mode, config.execution.order_qty
            );
            println!("  Feed: {}", config.alpaca.bar_stream_url());
        }
    }

    Ok(())
}
