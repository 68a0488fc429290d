//! Size command implementation

use crate::config::Config;
use crate::risk::RiskController;
use clap::Args;
use rust_decimal::Decimal;

#[derive(Args, Debug)]
pub struct SizeArgs {
    /// Entry price
    #[arg(long)]
    pub entry: Decimal,

    /// Stop-loss price
    #[arg(long)]
    pub stop: Decimal,

    /// Recent return volatility of the symbol
    #[arg(long, default_value = "0")]
    pub volatility: Decimal,
}

impl SizeArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let controller = RiskController::from_config(config.risk.clone());
        let size = controller.calculate_position_size(self.entry, self.stop, &[], self.volatility);

        tracing::info!(entry = %self.entry, stop = %self.stop, %size, "Sized trade idea");
        println!("Risk per trade:  {}", controller.risk_per_trade());
        println!("Price distance:  {}", (self.entry - self.stop).abs());
        println!("Position size:   {}", size.round_dp(8));
        println!("Notional:        {}", (size * self.entry).round_dp(2));
        Ok(())
    }
}
