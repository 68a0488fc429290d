//! Execution types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Exchange-assigned order identifier
pub type OrderId = String;

/// Order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The side that closes a position opened on this side
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Market order (immediate execution)
    Market,
    /// Stop order triggered at `stop_price`
    Stop,
    /// Limit order (price specified)
    Limit,
}

/// Extra order parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderParams {
    /// Trigger price for stop orders
    pub stop_price: Option<Decimal>,
    /// Marks a limit order as the take-profit leg of a bracket
    pub take_profit: bool,
}

/// An order to be submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub order_type: OrderType,
    pub side: OrderSide,
    pub quantity: Decimal,
    /// Limit price; `None` for market and stop orders
    pub price: Option<Decimal>,
    pub params: OrderParams,
}

impl OrderRequest {
    /// Market order
    pub fn market(symbol: &str, side: OrderSide, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            order_type: OrderType::Market,
            side,
            quantity,
            price: None,
            params: OrderParams::default(),
        }
    }

    /// Stop-loss order triggered at `stop_price`
    pub fn stop_loss(symbol: &str, side: OrderSide, quantity: Decimal, stop_price: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            order_type: OrderType::Stop,
            side,
            quantity,
            price: None,
            params: OrderParams {
                stop_price: Some(stop_price),
                take_profit: false,
            },
        }
    }

    /// Take-profit limit order at `price`
    pub fn take_profit(symbol: &str, side: OrderSide, quantity: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            order_type: OrderType::Limit,
            side,
            quantity,
            price: Some(price),
            params: OrderParams {
                stop_price: None,
                take_profit: true,
            },
        }
    }
}

/// Lifecycle state reported by the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    Open,
    Closed,
    Canceled,
}

/// An order as reported by the exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    /// Fill price for executed orders, limit price for resting ones
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub state: OrderState,
    pub created_at: DateTime<Utc>,
}

/// Result of an order-status lookup
#[derive(Debug, Clone, PartialEq)]
pub enum OrderStatus {
    Found(OrderRecord),
    /// Absent from both open and closed orders
    NotFound,
}

impl OrderStatus {
    /// The order, if it was found
    pub fn record(&self) -> Option<&OrderRecord> {
        match self {
            OrderStatus::Found(record) => Some(record),
            OrderStatus::NotFound => None,
        }
    }
}

/// The three legs of a placed bracket order
#[derive(Debug, Clone, PartialEq)]
pub struct BracketOrder {
    /// Status of the entry leg after the settle delay
    pub entry: OrderStatus,
    pub stop_loss: OrderRecord,
    pub take_profit: OrderRecord,
    /// Attempts used, including the successful one
    pub attempts: u32,
}

/// Errors reported by an exchange connection
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExchangeError {
    #[error("network error: {0}")]
    Network(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("invalid order: {0}")]
    InvalidOrder(String),
    #[error("exchange error: {0}")]
    Other(String),
}

impl ExchangeError {
    /// Network and rate-limit failures are expected to clear on their own.
    ///
    /// Used for logging only: the bracket retry loop retries every kind.
    pub fn is_transient(&self) -> bool {
        matches!(self, ExchangeError::Network(_) | ExchangeError::RateLimited(_))
    }
}

/// Errors surfaced by the execution scheduler
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Every bracket attempt failed
    #[error("bracket order for {symbol} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        symbol: String,
        attempts: u32,
        last_error: ExchangeError,
    },
    /// A slice order failed; earlier slices stay executed
    #[error("slice of {quantity} {symbol} failed after executing {executed}: {source}")]
    SliceFailed {
        symbol: String,
        quantity: Decimal,
        executed: Decimal,
        source: ExchangeError,
    },
    /// The adaptive probe failed
    #[error("market probe failed for {symbol}: {source}")]
    Probe {
        symbol: String,
        source: ExchangeError,
    },
    /// A probe reading cannot size a slice
    #[error("unusable market sample: {0}")]
    InvalidMarketSample(String),
    /// Plan parameters out of range
    #[error("invalid plan: {0}")]
    InvalidPlan(String),
    /// Illegal state change
    #[error("plan cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        from: super::PlanState,
        to: super::PlanState,
    },
    /// Cancelled at a suspension point
    #[error("plan {0} cancelled")]
    Cancelled(Uuid),
}
