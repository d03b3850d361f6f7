//! Backtest reporting

use rust_decimal::Decimal;

/// Result of simulating one symbol
#[derive(Debug, Clone)]
pub struct SymbolReport {
    /// Symbol simulated
    pub symbol: String,
    /// Cash at the start
    pub starting_balance: Decimal,
    /// Cash after liquidating the final inventory
    pub ending_balance: Decimal,
    /// 1 + pnl / starting balance
    pub roi: Decimal,
    /// Shares held before the final liquidation
    pub final_shares: i64,
    /// Balance had the starting cash been invested at the first close
    pub hold_balance: Decimal,
    /// Decision counts over the simulated rows
    pub buys: usize,
    pub sells: usize,
    pub holds: usize,
    /// Rows simulated after indicator warmup
    pub rows: usize,
    /// Whether the ROI cleared the trading gate
    pub enabled: bool,
}

impl SymbolReport {
    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        format!(
            r#"
══════════════════════════════════════════════════════
  BACKTEST — {}
══════════════════════════════════════════════════════
Starting balance:   ${:.2}
Ending balance:     ${:.2} (liquidated {} shares at end)
Buy and hold:       ${:.2}
ROI:                {:.4}
Decisions:          {} buy / {} sell / {} hold over {} bars
Live trading:       {}
══════════════════════════════════════════════════════
"#,
            self.symbol,
            self.starting_balance,
            self.ending_balance,
            self.final_shares,
            self.hold_balance,
            self.roi,
            self.buys,
            self.sells,
            self.holds,
            self.rows,
            if self.enabled { "enabled" } else { "disabled" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_table_contains_key_figures() {
        let report = SymbolReport {
            symbol: "AAPL".to_string(),
            starting_balance: dec!(10000),
            ending_balance: dec!(10420.55),
            roi: dec!(1.0421),
            final_shares: 3,
            hold_balance: dec!(10100),
            buys: 12,
            sells: 9,
            holds: 370,
            rows: 391,
            enabled: true,
        };

        let table = report.format_table();
        assert!(table.contains("AAPL"));
        assert!(table.contains("10420.55"));
        assert!(table.contains("1.0421"));
        assert!(table.contains("enabled"));
    }
}
