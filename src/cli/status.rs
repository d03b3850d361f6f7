//! Status command implementation

use crate::broker::TradingClient;
use crate::config::{Config, Credentials};
use clap::Args;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Also list open positions
    #[arg(long)]
    pub positions: bool,
}

impl StatusArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let credentials = Credentials::from_env()?;
        let trading = TradingClient::new(&config.alpaca.trading_url, credentials);

        let clock = trading.get_clock().await?;
        let account = trading.get_account().await?;

        println!("barbot status");
        println!(
            "  Market: {} (next open {}, next close {})",
            if clock.is_open { "open" } else { "closed" },
            clock.next_open,
            clock.next_close
        );
        println!(
            "  Account: {} ({} {})",
            account.status, account.equity, account.currency
        );
        println!("  Cash: {}", account.cash);
        println!("  Buying power: {}", account.buying_power);

        if self.positions {
            let positions = trading.get_positions().await?;
            if positions.is_empty() {
                println!("  Positions: none");
            } else {
                println!("  Positions:");
                for position in positions {
                    println!(
                        "    {} {} {} @ {}",
                        position.side, position.qty, position.symbol, position.avg_entry_price
                    );
                }
            }
        }

        Ok(())
    }
}
