//! Shared risk controller handle
//!
//! Many per-symbol tasks size against one controller. Mutations hold the
//! write lock for their whole duration so history eviction and the budget
//! update never interleave; queries share the read lock.

use super::{CorrelationMatrix, Position, RiskController, TradeRecord};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cloneable handle to a controller shared across tasks
#[derive(Debug, Clone)]
pub struct SharedRiskController {
    inner: Arc<RwLock<RiskController>>,
}

impl SharedRiskController {
    /// Wrap a controller for shared use
    pub fn new(controller: RiskController) -> Self {
        Self {
            inner: Arc::new(RwLock::new(controller)),
        }
    }

    /// Size an entry against the current budget
    pub async fn calculate_position_size(
        &self,
        entry_price: Decimal,
        stop_loss_price: Decimal,
        open_positions: &[Position],
        volatility: Decimal,
    ) -> Decimal {
        self.inner
            .read()
            .await
            .calculate_position_size(entry_price, stop_loss_price, open_positions, volatility)
    }

    /// Size an entry and discount it for correlation under one read lock
    pub async fn size_with_correlation(
        &self,
        symbol: &str,
        entry_price: Decimal,
        stop_loss_price: Decimal,
        open_positions: &[Position],
        volatility: Decimal,
        correlation_matrix: &CorrelationMatrix,
    ) -> Decimal {
        let controller = self.inner.read().await;
        let size = controller.calculate_position_size(
            entry_price,
            stop_loss_price,
            open_positions,
            volatility,
        );
        controller.adjust_for_correlation(size, symbol, open_positions, correlation_matrix)
    }

    /// Portfolio Value-at-Risk
    pub async fn calculate_var(&self, positions: &[Position], volatilities: &[f64]) -> Decimal {
        self.inner.read().await.calculate_var(positions, volatilities)
    }

    /// Current per-trade risk budget
    pub async fn risk_per_trade(&self) -> Decimal {
        self.inner.read().await.risk_per_trade()
    }

    /// Number of trades currently retained
    pub async fn history_len(&self) -> usize {
        self.inner.read().await.trade_history().len()
    }

    /// Append a closed trade
    pub async fn record_trade(&self, trade: TradeRecord) {
        self.inner.write().await.record_trade(trade);
    }

    /// Adapt the budget to the latest volatility
    pub async fn update_risk_parameters(&self, market_volatility: Decimal) {
        self.inner
            .write()
            .await
            .update_risk_parameters(market_volatility);
    }

    /// Copy of the controller state
    pub async fn snapshot(&self) -> RiskController {
        self.inner.read().await.clone()
    }
}
