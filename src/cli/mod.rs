//! CLI interface for riskloop
//!
//! Provides subcommands for:
//! - `size`: Size a trade idea under the configured risk budget
//! - `execute`: Run an order against the paper exchange
//! - `config`: Show the effective configuration

mod execute;
mod size;

pub use execute::ExecuteArgs;
pub use size::SizeArgs;

use crate::execution::OrderSide;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "riskloop")]
#[command(about = "Adaptive risk sizing and paced order execution")]
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
    /// Size a trade idea
    Size(SizeArgs),
    /// Execute an order on the paper exchange
    Execute(ExecuteArgs),
    /// Show configuration
    Config,
}

fn parse_side(s: &str) -> Result<OrderSide, String> {
    match s.to_lowercase().as_str() {
        "buy" | "long" => Ok(OrderSide::Buy),
        "sell" | "short" => Ok(OrderSide::Sell),
        other => Err(format!("unknown side: {other}")),
    }
}
