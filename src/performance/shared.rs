//! Shared performance tracker handle

use super::{PerformanceError, PerformanceMetrics, PerformanceTracker};
use crate::risk::{Position, TradeRecord};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cloneable handle to a tracker shared across tasks
#[derive(Debug, Clone, Default)]
pub struct SharedPerformanceTracker {
    inner: Arc<RwLock<PerformanceTracker>>,
}

impl SharedPerformanceTracker {
    pub fn new(tracker: PerformanceTracker) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tracker)),
        }
    }

    /// Sample equity from open positions and latest prices
    pub async fn update(
        &self,
        open_positions: &[Position],
        latest_prices: &HashMap<String, Decimal>,
    ) -> Result<Decimal, PerformanceError> {
        self.inner.write().await.update(open_positions, latest_prices)
    }

    pub async fn record_trade(&self, trade: TradeRecord) {
        self.inner.write().await.record_trade(trade);
    }

    pub async fn calculate_metrics(&self) -> PerformanceMetrics {
        self.inner.read().await.calculate_metrics()
    }

    /// Copy of the equity curve
    pub async fn equity_curve(&self) -> Vec<Decimal> {
        self.inner.read().await.equity_curve().to_vec()
    }
}
