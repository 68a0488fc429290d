//! Strategy types

use crate::execution::OrderSide;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Strategy that produced a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Momentum,
    MeanReversion,
    Breakout,
}

impl StrategyKind {
    /// Every kind, in dispatch order
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Momentum,
        StrategyKind::MeanReversion,
        StrategyKind::Breakout,
    ];
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Momentum => write!(f, "momentum"),
            StrategyKind::MeanReversion => write!(f, "mean_reversion"),
            StrategyKind::Breakout => write!(f, "breakout"),
        }
    }
}

/// What a signal asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Buy,
    Sell,
    /// Exit any open position in the symbol
    Close,
    Hold,
}

impl SignalAction {
    /// Entry side, for actions that open a position
    pub fn entry_side(self) -> Option<OrderSide> {
        match self {
            SignalAction::Buy => Some(OrderSide::Buy),
            SignalAction::Sell => Some(OrderSide::Sell),
            SignalAction::Close | SignalAction::Hold => None,
        }
    }
}

/// A trading signal with its protective levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub action: SignalAction,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
}

/// Market state a strategy decides on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub last_price: Decimal,
    pub volatility: Decimal,
    pub timestamp: DateTime<Utc>,
}
