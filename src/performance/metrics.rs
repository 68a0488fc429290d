//! Performance metric types

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A metric that needs a minimum amount of data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Metric<T> {
    Value(T),
    /// Too few samples, or a degenerate series (zero base, zero deviation)
    InsufficientData,
}

impl<T> Metric<T> {
    /// The value, if there was enough data
    pub fn value(self) -> Option<T> {
        match self {
            Metric::Value(v) => Some(v),
            Metric::InsufficientData => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Metric<U> {
        match self {
            Metric::Value(v) => Metric::Value(f(v)),
            Metric::InsufficientData => Metric::InsufficientData,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Metric<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Value(v) => v.fmt(f),
            Metric::InsufficientData => f.write_str("n/a"),
        }
    }
}

/// Summary computed from a tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// `last / first - 1` over the equity curve
    pub total_return: Metric<Decimal>,
    /// Annualized over 252 periods
    pub sharpe_ratio: Metric<f64>,
    /// Largest peak-to-trough decline as a fraction of the peak
    pub max_drawdown: Decimal,
    /// Share of trades with positive profit
    pub win_rate: Decimal,
    pub total_trades: usize,
    pub equity_samples: usize,
}

impl PerformanceMetrics {
    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        format!(
            r#"
══════════════════════════════════════════════════════
               PERFORMANCE
══════════════════════════════════════════════════════

RETURNS
───────────────────────────────────────────────────────
Total Return:     {:.2}%
Sharpe Ratio:     {:.2}
Max Drawdown:     {:.2}%

TRADES
───────────────────────────────────────────────────────
Total Trades:     {}
Win Rate:         {:.1}%
Equity Samples:   {}
══════════════════════════════════════════════════════
"#,
            self.total_return.map(|r| r * dec!(100)),
            self.sharpe_ratio,
            self.max_drawdown * dec!(100),
            self.total_trades,
            self.win_rate * dec!(100),
            self.equity_samples,
        )
    }
}
