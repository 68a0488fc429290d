//! Execute command implementation

use super::parse_side;
use crate::config::Config;
use crate::execution::{
    ExecutionAlgorithm, ExecutionPlan, ExecutionScheduler, MarketReading, OrderSide, PaperExchange,
};
use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct ExecuteArgs {
    /// Symbol to trade
    #[arg(long, default_value = "BTC/USDT")]
    pub symbol: String,

    /// Order side: buy or sell
    #[arg(long, value_parser = parse_side)]
    pub side: OrderSide,

    /// Total quantity
    #[arg(long)]
    pub quantity: Decimal,

    /// Paper mark price
    #[arg(long)]
    pub price: Decimal,

    /// Slicing algorithm; defaults to the configured one
    #[arg(long)]
    pub algorithm: Option<ExecutionAlgorithm>,

    /// Execution window in seconds; defaults to the configured one
    #[arg(long)]
    pub window: Option<u64>,

    /// Place a bracket order with this stop-loss instead of slicing
    #[arg(long, requires = "take_profit")]
    pub stop_loss: Option<Decimal>,

    /// Take-profit price for the bracket order
    #[arg(long, requires = "stop_loss")]
    pub take_profit: Option<Decimal>,

    /// Print fills as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl ExecuteArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let exchange = PaperExchange::new();
        exchange.set_mark_price(&self.symbol, self.price).await;
        exchange
            .set_market_reading(
                &self.symbol,
                MarketReading {
                    volume: dec!(1),
                    average_volume: dec!(1),
                    volatility: dec!(1),
                    average_volatility: dec!(1),
                },
            )
            .await;

        let scheduler = ExecutionScheduler::new(Arc::new(exchange.clone()), config.execution.clone());

        if let (Some(stop_loss), Some(take_profit)) = (self.stop_loss, self.take_profit) {
            let bracket = scheduler
                .place_bracket_order(&self.symbol, self.side, self.quantity, stop_loss, take_profit)
                .await?;
            println!("Bracket placed after {} attempt(s)", bracket.attempts);
            println!("  Stop loss:   {} @ {}", bracket.stop_loss.id, stop_loss);
            println!("  Take profit: {} @ {}", bracket.take_profit.id, take_profit);
            return Ok(());
        }

        let algorithm = self.algorithm.unwrap_or(config.trading.algorithm);
        let window = Duration::from_secs(self.window.unwrap_or(config.trading.time_window_secs));
        let mut plan = ExecutionPlan::new(&self.symbol, self.side, self.quantity, window, algorithm)?;

        tracing::info!(plan_id = %plan.id, ?algorithm, ?window, "Running paper execution");
        scheduler.execute(&mut plan, &exchange).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(plan.fills())?);
            return Ok(());
        }

        println!("Plan {} {:?}", plan.id, plan.state());
        println!("  Executed: {} / {}", plan.executed_quantity(), plan.total_quantity);
        for (i, fill) in plan.fills().iter().enumerate() {
            println!("  #{:<3} {} {}", i + 1, fill.quantity, fill.price.unwrap_or_default());
        }
        Ok(())
    }
}
