//! Equity curve and trade ledger

use super::{Metric, PerformanceMetrics};
use crate::risk::{Position, TradeRecord};
use crate::telemetry::{set_gauge, GaugeMetric};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use statrs::statistics::Statistics;
use std::collections::HashMap;
use thiserror::Error;

/// Trading periods per year used to annualize Sharpe
const PERIODS_PER_YEAR: f64 = 252.0;

/// Errors raised while sampling equity
#[derive(Debug, Error, PartialEq)]
pub enum PerformanceError {
    #[error("no latest price for open position in {0}")]
    MissingPrice(String),
}

/// Append-only equity curve and trade ledger
#[derive(Debug, Clone, Default)]
pub struct PerformanceTracker {
    equity_curve: Vec<Decimal>,
    trades: Vec<TradeRecord>,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the current value of the open positions
    ///
    /// Value is `Σ size * latest price`. Every position needs a price;
    /// otherwise nothing is appended.
    pub fn update(
        &mut self,
        open_positions: &[Position],
        latest_prices: &HashMap<String, Decimal>,
    ) -> Result<Decimal, PerformanceError> {
        let mut equity = Decimal::ZERO;
        for position in open_positions {
            let price = latest_prices
                .get(&position.symbol)
                .ok_or_else(|| PerformanceError::MissingPrice(position.symbol.clone()))?;
            equity += position.size * price;
        }

        self.equity_curve.push(equity);
        set_gauge(GaugeMetric::Equity, equity.to_f64().unwrap_or(0.0));
        tracing::debug!(%equity, samples = self.equity_curve.len(), "Equity sampled");
        Ok(equity)
    }

    /// Append a closed trade
    pub fn record_trade(&mut self, trade: TradeRecord) {
        self.trades.push(trade);
    }

    pub fn equity_curve(&self) -> &[Decimal] {
        &self.equity_curve
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// Compute all metrics from the current curve and ledger
    pub fn calculate_metrics(&self) -> PerformanceMetrics {
        PerformanceMetrics {
            total_return: self.total_return(),
            sharpe_ratio: self.sharpe_ratio(),
            max_drawdown: self.max_drawdown(),
            win_rate: self.win_rate(),
            total_trades: self.trades.len(),
            equity_samples: self.equity_curve.len(),
        }
    }

    fn total_return(&self) -> Metric<Decimal> {
        match (self.equity_curve.first(), self.equity_curve.last()) {
            (Some(first), Some(last)) if self.equity_curve.len() >= 2 && !first.is_zero() => {
                Metric::Value(last / first - Decimal::ONE)
            }
            _ => Metric::InsufficientData,
        }
    }

    /// Period-over-period returns, skipping periods that start from zero
    fn period_returns(&self) -> Vec<f64> {
        self.equity_curve
            .windows(2)
            .filter(|w| !w[0].is_zero())
            .filter_map(|w| (w[1] / w[0] - Decimal::ONE).to_f64())
            .collect()
    }

    fn sharpe_ratio(&self) -> Metric<f64> {
        let returns = self.period_returns();
        if returns.len() < 2 {
            return Metric::InsufficientData;
        }

        let mean = returns.iter().mean();
        let std_dev = returns.iter().std_dev();
        if !std_dev.is_finite() || std_dev == 0.0 {
            return Metric::InsufficientData;
        }
        Metric::Value(PERIODS_PER_YEAR.sqrt() * mean / std_dev)
    }

    fn max_drawdown(&self) -> Decimal {
        let mut running_max = match self.equity_curve.first() {
            Some(first) => *first,
            None => return Decimal::ZERO,
        };

        let mut max_drawdown = Decimal::ZERO;
        for value in &self.equity_curve {
            running_max = running_max.max(*value);
            if running_max > Decimal::ZERO {
                max_drawdown = max_drawdown.max((running_max - value) / running_max);
            }
        }
        max_drawdown
    }

    fn win_rate(&self) -> Decimal {
        if self.trades.is_empty() {
            return Decimal::ZERO;
        }
        let wins = self.trades.iter().filter(|t| t.is_win()).count();
        Decimal::from(wins) / Decimal::from(self.trades.len())
    }
}
