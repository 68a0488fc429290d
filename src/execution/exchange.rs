//! Exchange-facing interfaces consumed by the scheduler

use super::{ExchangeError, OrderRecord, OrderRequest};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Order entry and lookup on a trading venue
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Set leverage for a symbol
    async fn set_leverage(&self, leverage: u32, symbol: &str) -> Result<(), ExchangeError>;
    /// Submit an order
    async fn create_order(&self, request: OrderRequest) -> Result<OrderRecord, ExchangeError>;
    /// Orders still resting on the book
    async fn fetch_open_orders(&self, symbol: &str) -> Result<Vec<OrderRecord>, ExchangeError>;
    /// Filled or cancelled orders
    async fn fetch_closed_orders(&self, symbol: &str) -> Result<Vec<OrderRecord>, ExchangeError>;
}

/// Live market readings used by adaptive slicing
///
/// Averages are rolling values maintained outside the scheduler.
#[async_trait]
pub trait MarketProbe: Send + Sync {
    async fn current_volume(&self, symbol: &str) -> Result<Decimal, ExchangeError>;
    async fn current_volatility(&self, symbol: &str) -> Result<Decimal, ExchangeError>;
    async fn average_volume(&self, symbol: &str) -> Result<Decimal, ExchangeError>;
    async fn average_volatility(&self, symbol: &str) -> Result<Decimal, ExchangeError>;
}
