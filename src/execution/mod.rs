//! Execution module
//!
//! Bracket orders with retry and paced slicing of large orders against an
//! [`Exchange`] connection.

mod exchange;
mod paper;
mod plan;
mod scheduler;
mod types;

pub use exchange::{Exchange, MarketProbe};
pub use paper::{MarketReading, PaperExchange};
pub use plan::{CancellationFlag, ExecutionAlgorithm, ExecutionPlan, PlanState};
pub use scheduler::ExecutionScheduler;
pub use types::{
    BracketOrder, ExchangeError, ExecutionError, OrderId, OrderParams, OrderRecord, OrderRequest,
    OrderSide, OrderState, OrderStatus, OrderType,
};
