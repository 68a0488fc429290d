//! Paper trading exchange

use super::{
    Exchange, ExchangeError, MarketProbe, OrderRecord, OrderRequest, OrderState, OrderType,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Market readings served to adaptive slicing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketReading {
    pub volume: Decimal,
    pub average_volume: Decimal,
    pub volatility: Decimal,
    pub average_volatility: Decimal,
}

/// In-memory exchange with simulated fills
///
/// Market orders fill immediately at the symbol's mark price. Stop and
/// limit orders rest as open orders and never trigger.
#[derive(Clone, Default)]
pub struct PaperExchange {
    marks: Arc<RwLock<HashMap<String, Decimal>>>,
    readings: Arc<RwLock<HashMap<String, MarketReading>>>,
    leverage: Arc<RwLock<HashMap<String, u32>>>,
    orders: Arc<RwLock<Vec<OrderRecord>>>,
}

impl PaperExchange {
    /// Create an empty paper exchange
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the price market orders fill at
    pub async fn set_mark_price(&self, symbol: &str, price: Decimal) {
        self.marks.write().await.insert(symbol.to_string(), price);
    }

    /// Set the readings returned by the market probe
    pub async fn set_market_reading(&self, symbol: &str, reading: MarketReading) {
        self.readings
            .write()
            .await
            .insert(symbol.to_string(), reading);
    }

    /// Leverage last set for a symbol
    pub async fn leverage(&self, symbol: &str) -> Option<u32> {
        self.leverage.read().await.get(symbol).copied()
    }

    /// Every order accepted so far, in submission order
    pub async fn orders(&self) -> Vec<OrderRecord> {
        self.orders.read().await.clone()
    }

    /// Executed market orders
    pub async fn fills(&self) -> Vec<OrderRecord> {
        self.orders
            .read()
            .await
            .iter()
            .filter(|o| o.state == OrderState::Closed)
            .cloned()
            .collect()
    }

    async fn reading(&self, symbol: &str) -> Result<MarketReading, ExchangeError> {
        self.readings
            .read()
            .await
            .get(symbol)
            .copied()
            .ok_or_else(|| ExchangeError::Other(format!("no market reading for {symbol}")))
    }

    async fn orders_in(&self, symbol: &str, state: OrderState) -> Vec<OrderRecord> {
        self.orders
            .read()
            .await
            .iter()
            .filter(|o| o.symbol == symbol && o.state == state)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Exchange for PaperExchange {
    async fn set_leverage(&self, leverage: u32, symbol: &str) -> Result<(), ExchangeError> {
        if leverage == 0 {
            return Err(ExchangeError::InvalidOrder(
                "leverage must be at least 1".to_string(),
            ));
        }
        self.leverage
            .write()
            .await
            .insert(symbol.to_string(), leverage);
        tracing::debug!(symbol, leverage, "Paper leverage set");
        Ok(())
    }

    async fn create_order(&self, request: OrderRequest) -> Result<OrderRecord, ExchangeError> {
        if request.quantity <= Decimal::ZERO {
            return Err(ExchangeError::InvalidOrder(format!(
                "quantity must be positive, got {}",
                request.quantity
            )));
        }

        let (price, state) = match request.order_type {
            OrderType::Market => {
                let mark = self
                    .marks
                    .read()
                    .await
                    .get(&request.symbol)
                    .copied()
                    .ok_or_else(|| {
                        ExchangeError::InvalidOrder(format!("no mark price for {}", request.symbol))
                    })?;
                (Some(mark), OrderState::Closed)
            }
            OrderType::Stop | OrderType::Limit => (request.price, OrderState::Open),
        };

        let record = OrderRecord {
            id: Uuid::new_v4().to_string(),
            symbol: request.symbol,
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity,
            price,
            stop_price: request.params.stop_price,
            state,
            created_at: Utc::now(),
        };

        self.orders.write().await.push(record.clone());
        tracing::info!(order_id = %record.id, symbol = %record.symbol, state = ?record.state, "Paper order accepted");
        Ok(record)
    }

    async fn fetch_open_orders(&self, symbol: &str) -> Result<Vec<OrderRecord>, ExchangeError> {
        Ok(self.orders_in(symbol, OrderState::Open).await)
    }

    async fn fetch_closed_orders(&self, symbol: &str) -> Result<Vec<OrderRecord>, ExchangeError> {
        Ok(self.orders_in(symbol, OrderState::Closed).await)
    }
}

#[async_trait]
impl MarketProbe for PaperExchange {
    async fn current_volume(&self, symbol: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.reading(symbol).await?.volume)
    }

    async fn current_volatility(&self, symbol: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.reading(symbol).await?.volatility)
    }

    async fn average_volume(&self, symbol: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.reading(symbol).await?.average_volume)
    }

    async fn average_volatility(&self, symbol: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.reading(symbol).await?.average_volatility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::OrderSide;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_market_order_fills_at_mark() {
        let exchange = PaperExchange::new();
        exchange.set_mark_price("BTC/USDT", dec!(50000)).await;

        let order = exchange
            .create_order(OrderRequest::market("BTC/USDT", OrderSide::Buy, dec!(0.5)))
            .await
            .unwrap();

        assert_eq!(order.state, OrderState::Closed);
        assert_eq!(order.price, Some(dec!(50000)));
        assert_eq!(exchange.fills().await.len(), 1);
    }

    #[tokio::test]
    async fn test_market_order_without_mark_rejected() {
        let exchange = PaperExchange::new();
        let result = exchange
            .create_order(OrderRequest::market("ETH/USDT", OrderSide::Buy, dec!(1)))
            .await;
        assert!(matches!(result, Err(ExchangeError::InvalidOrder(_))));
        assert!(exchange.orders().await.is_empty());
    }

    #[tokio::test]
    async fn test_protective_orders_rest_open() {
        let exchange = PaperExchange::new();
        exchange
            .create_order(OrderRequest::stop_loss("BTC/USDT", OrderSide::Sell, dec!(1), dec!(95)))
            .await
            .unwrap();
        exchange
            .create_order(OrderRequest::take_profit("BTC/USDT", OrderSide::Sell, dec!(1), dec!(120)))
            .await
            .unwrap();

        let open = exchange.fetch_open_orders("BTC/USDT").await.unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(open[0].stop_price, Some(dec!(95)));
        assert_eq!(open[1].price, Some(dec!(120)));
        assert!(exchange.fetch_closed_orders("BTC/USDT").await.unwrap().is_empty());
        assert!(exchange.fetch_open_orders("ETH/USDT").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let exchange = PaperExchange::new();
        exchange.set_mark_price("BTC/USDT", dec!(100)).await;
        let result = exchange
            .create_order(OrderRequest::market("BTC/USDT", OrderSide::Buy, dec!(0)))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_leverage_recorded() {
        let exchange = PaperExchange::new();
        exchange.set_leverage(3, "BTC/USDT").await.unwrap();
        assert_eq!(exchange.leverage("BTC/USDT").await, Some(3));
        assert!(exchange.set_leverage(0, "BTC/USDT").await.is_err());
    }

    #[tokio::test]
    async fn test_market_probe_readings() {
        let exchange = PaperExchange::new();
        assert!(exchange.current_volume("BTC/USDT").await.is_err());

        exchange
            .set_market_reading(
                "BTC/USDT",
                MarketReading {
                    volume: dec!(1200),
                    average_volume: dec!(1000),
                    volatility: dec!(0.03),
                    average_volatility: dec!(0.02),
                },
            )
            .await;

        assert_eq!(exchange.current_volume("BTC/USDT").await.unwrap(), dec!(1200));
        assert_eq!(exchange.average_volume("BTC/USDT").await.unwrap(), dec!(1000));
        assert_eq!(exchange.current_volatility("BTC/USDT").await.unwrap(), dec!(0.03));
        assert_eq!(exchange.average_volatility("BTC/USDT").await.unwrap(), dec!(0.02));
    }
}
