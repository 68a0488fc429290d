//! Signal generation interface

use super::{MarketSnapshot, Signal, StrategyKind};
use thiserror::Error;

/// Errors raised by signal generation
#[derive(Debug, Error, PartialEq)]
pub enum StrategyError {
    #[error("strategy {0} has no signal logic")]
    NotImplemented(StrategyKind),
    #[error("snapshot for {symbol} unusable: {reason}")]
    InvalidSnapshot { symbol: String, reason: String },
}

/// Turns a market snapshot into a trading signal
pub trait SignalGenerator: Send + Sync {
    fn generate_signal(&self, snapshot: &MarketSnapshot) -> Result<Signal, StrategyError>;
}

impl SignalGenerator for StrategyKind {
    /// Concrete strategy logic is supplied outside this crate; every kind
    /// reports itself as unimplemented after validating the snapshot.
    fn generate_signal(&self, snapshot: &MarketSnapshot) -> Result<Signal, StrategyError> {
        if snapshot.last_price <= rust_decimal::Decimal::ZERO {
            return Err(StrategyError::InvalidSnapshot {
                symbol: snapshot.symbol.clone(),
                reason: format!("non-positive price {}", snapshot.last_price),
            });
        }
        Err(StrategyError::NotImplemented(*self))
    }
}
