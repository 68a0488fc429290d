//! Position tracking

use super::TradeRecord;
use crate::execution::OrderSide;
use crate::strategy::StrategyKind;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An open position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Traded symbol
    pub symbol: String,
    /// Direction of the entry
    pub side: OrderSide,
    /// Position size (never negative)
    pub size: Decimal,
    /// Entry price
    pub entry_price: Decimal,
    /// Protective stop price
    pub stop_loss: Decimal,
    /// Profit target price
    pub take_profit: Decimal,
    /// Strategy that produced the entry
    pub strategy: StrategyKind,
    /// Entry timestamp
    pub opened_at: DateTime<Utc>,
}

impl Position {
    /// Entry notional (size * entry price)
    pub fn notional(&self) -> Decimal {
        self.size * self.entry_price
    }

    /// Signed P&L if the position were closed at `price`
    pub fn pnl_at(&self, price: Decimal) -> Decimal {
        match self.side {
            OrderSide::Buy => (price - self.entry_price) * self.size,
            OrderSide::Sell => (self.entry_price - price) * self.size,
        }
    }
}

/// Open positions keyed by symbol, kept in insertion order
///
/// Order matters: volatilities passed to VaR are paired with positions
/// in the order returned by [`PositionBook::positions`].
#[derive(Debug, Clone, Default)]
pub struct PositionBook {
    positions: Vec<Position>,
}

impl PositionBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a filled entry, replacing any position already held in the symbol
    pub fn open(&mut self, position: Position) {
        match self
            .positions
            .iter_mut()
            .find(|p| p.symbol == position.symbol)
        {
            Some(existing) => *existing = position,
            None => self.positions.push(position),
        }
    }

    /// Remove a position and build the trade record for its exit
    pub fn close(&mut self, symbol: &str, exit_price: Decimal) -> Option<(Position, TradeRecord)> {
        let index = self.positions.iter().position(|p| p.symbol == symbol)?;
        let position = self.positions.remove(index);

        let profit = position.pnl_at(exit_price);
        let notional = position.notional();
        let return_pct = if notional.is_zero() {
            Decimal::ZERO
        } else {
            profit / notional
        };

        Some((position, TradeRecord::new(profit, return_pct)))
    }

    /// Look up the position held in a symbol
    pub fn get(&self, symbol: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.symbol == symbol)
    }

    /// All open positions in insertion order
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Sum of entry notionals
    pub fn total_exposure(&self) -> Decimal {
        self.positions.iter().map(Position::notional).sum()
    }

    /// Number of open positions
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether no position is open
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn test_position(symbol: &str, size: Decimal, entry_price: Decimal) -> Position {
    Position {
        symbol: symbol.to_string(),
        side: OrderSide::Buy,
        size,
        entry_price,
        stop_loss: entry_price * rust_decimal_macros::dec!(0.95),
        take_profit: entry_price * rust_decimal_macros::dec!(1.10),
        strategy: StrategyKind::Momentum,
        opened_at: Utc::now(),
    }
}
