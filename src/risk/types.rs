//! Risk management types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Pairwise return correlation between symbols, supplied by the caller
pub type CorrelationMatrix = HashMap<String, HashMap<String, f64>>;

/// Outcome of a closed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Realized profit in currency units (negative for a loss)
    pub profit: Decimal,
    /// Realized return as a fraction of entry notional
    pub return_pct: Decimal,
    /// Close timestamp
    pub closed_at: DateTime<Utc>,
}

impl TradeRecord {
    /// Create a record closed now
    pub fn new(profit: Decimal, return_pct: Decimal) -> Self {
        Self {
            profit,
            return_pct,
            closed_at: Utc::now(),
        }
    }

    /// Whether the trade made money
    pub fn is_win(&self) -> bool {
        self.profit > Decimal::ZERO
    }
}
