//! Dynamic risk controller
//!
//! Turns a trade idea into a bounded position size, estimates portfolio
//! Value-at-Risk, and adapts its own per-trade risk budget from the
//! recent trade history and market volatility.

use super::{CorrelationMatrix, Position, TradeRecord};
use crate::config::RiskConfig;
use crate::telemetry::{set_gauge, GaugeMetric};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// Sizes positions and adapts the risk budget
#[derive(Debug, Clone)]
pub struct RiskController {
    params: RiskConfig,
    /// Current per-trade risk budget in currency units
    risk_per_trade: Decimal,
    /// Most recent trades, oldest first, at most `lookback_period` long
    trade_history: VecDeque<TradeRecord>,
}

impl RiskController {
    /// Create a controller from validated risk configuration
    pub fn from_config(params: RiskConfig) -> Self {
        Self {
            risk_per_trade: params.risk_per_trade,
            trade_history: VecDeque::with_capacity(params.lookback_period + 1),
            params,
        }
    }

    /// Current per-trade risk budget
    pub fn risk_per_trade(&self) -> Decimal {
        self.risk_per_trade
    }

    /// Configured limits
    pub fn params(&self) -> &RiskConfig {
        &self.params
    }

    /// Trades retained for adaptation, oldest first
    pub fn trade_history(&self) -> &VecDeque<TradeRecord> {
        &self.trade_history
    }

    /// Calculate the position size for an entry protected by a stop
    ///
    /// Size risks `risk_per_trade` between entry and stop, shrinks with
    /// volatility, and never exceeds the capital left under
    /// `max_position_size` after existing exposure. Never negative.
    pub fn calculate_position_size(
        &self,
        entry_price: Decimal,
        stop_loss_price: Decimal,
        open_positions: &[Position],
        volatility: Decimal,
    ) -> Decimal {
        let price_difference = entry_price.saturating_sub(stop_loss_price).abs();
        if price_difference.is_zero() || entry_price <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let volatility_divisor = Decimal::ONE.saturating_add(volatility);
        if volatility_divisor <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let position_size = saturating_div(
            saturating_div(self.risk_per_trade, price_difference),
            volatility_divisor,
        );

        let total_exposure: Decimal = open_positions.iter().map(Position::notional).sum();
        let available_capital = self.params.max_position_size.saturating_sub(total_exposure);
        let capped = position_size.min(saturating_div(available_capital, entry_price));

        capped.max(Decimal::ZERO)
    }

    /// Discount a size by the average correlation with held symbols
    ///
    /// Returns `size` unchanged when nothing is held or the symbol has no
    /// row in the matrix. Symbols missing from the row count as
    /// uncorrelated. An average above 1 yields a negative size.
    pub fn adjust_for_correlation(
        &self,
        size: Decimal,
        symbol: &str,
        open_positions: &[Position],
        correlation_matrix: &CorrelationMatrix,
    ) -> Decimal {
        let Some(row) = correlation_matrix.get(symbol) else {
            return size;
        };
        if open_positions.is_empty() {
            return size;
        }

        let total_correlation: f64 = open_positions
            .iter()
            .map(|p| row.get(&p.symbol).copied().unwrap_or(0.0))
            .sum();
        let avg_correlation = total_correlation / open_positions.len() as f64;

        let factor = Decimal::try_from(1.0 - avg_correlation).unwrap_or(Decimal::ONE);
        size * factor
    }

    /// Parametric Value-at-Risk of the given positions
    ///
    /// `volatilities` pair with `positions` by index; unmatched entries on
    /// either side are ignored. The result is a loss estimate and is
    /// normally negative.
    pub fn calculate_var(&self, positions: &[Position], volatilities: &[f64]) -> Decimal {
        if positions.is_empty() {
            return Decimal::ZERO;
        }

        let portfolio_value: Decimal = positions.iter().map(Position::notional).sum();
        if portfolio_value.is_zero() {
            return Decimal::ZERO;
        }
        let portfolio_value = portfolio_value.to_f64().unwrap_or(0.0);

        let weighted_volatility: f64 = positions
            .iter()
            .zip(volatilities)
            .map(|(p, vol)| p.notional().to_f64().unwrap_or(0.0) * vol / portfolio_value)
            .sum();

        let z_score = Normal::standard().inverse_cdf(1.0 - self.params.var_confidence);
        let var = portfolio_value * z_score * weighted_volatility;

        let var = Decimal::try_from(var).unwrap_or(Decimal::ZERO);
        set_gauge(GaugeMetric::ValueAtRisk, var.to_f64().unwrap_or(0.0));
        var
    }

    /// Adapt the risk budget to recent results and current volatility
    ///
    /// Grows the budget 10% (capped at `max_risk_per_trade`) after a
    /// profitable lookback window and shrinks it 10% otherwise, then scales
    /// it by `market_volatility / average_volatility`. The volatility
    /// scaling is applied after the cap and is not re-clamped.
    pub fn update_risk_parameters(&mut self, market_volatility: Decimal) {
        let recent_performance = self.recent_performance();
        let average_volatility = self.average_volatility();
        let previous = self.risk_per_trade;

        if recent_performance > Decimal::ZERO {
            self.risk_per_trade = self
                .risk_per_trade
                .saturating_mul(dec!(1.1))
                .min(self.params.max_risk_per_trade);
        } else {
            self.risk_per_trade *= dec!(0.9);
        }

        // Not re-clamped; saturates at the Decimal range
        let volatility_ratio = saturating_div(market_volatility, average_volatility);
        self.risk_per_trade = self.risk_per_trade.saturating_mul(volatility_ratio);

        tracing::debug!(
            previous = %previous,
            risk_per_trade = %self.risk_per_trade,
            recent_performance = %recent_performance,
            average_volatility = %average_volatility,
            market_volatility = %market_volatility,
            "Risk budget updated"
        );
        set_gauge(
            GaugeMetric::RiskPerTrade,
            self.risk_per_trade.to_f64().unwrap_or(0.0),
        );
    }

    /// Append a closed trade, evicting the oldest beyond the lookback
    pub fn record_trade(&mut self, trade: TradeRecord) {
        self.trade_history.push_back(trade);
        while self.trade_history.len() > self.params.lookback_period {
            self.trade_history.pop_front();
        }
    }

    /// Total profit over the retained window
    fn recent_performance(&self) -> Decimal {
        self.trade_history.iter().map(|t| t.profit).sum()
    }

    /// Population stddev of retained trade returns
    ///
    /// Neutral 1 until a full lookback window exists. A window of identical
    /// returns also reports 1 so the volatility ratio stays finite.
    fn average_volatility(&self) -> Decimal {
        if self.trade_history.len() < self.params.lookback_period {
            return Decimal::ONE;
        }

        let returns: Vec<f64> = self
            .trade_history
            .iter()
            .filter_map(|t| t.return_pct.to_f64())
            .collect();
        let std_dev = returns.population_std_dev();

        if !std_dev.is_finite() || std_dev <= 0.0 {
            return Decimal::ONE;
        }
        Decimal::try_from(std_dev).unwrap_or(Decimal::ONE)
    }
}

/// Division that saturates at the Decimal range instead of panicking
///
/// Callers never pass a zero divisor.
fn saturating_div(dividend: Decimal, divisor: Decimal) -> Decimal {
    dividend.checked_div(divisor).unwrap_or_else(|| {
        if dividend.is_sign_negative() != divisor.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        }
    })
}
