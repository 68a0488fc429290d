//! Risk management module
//!
//! Position sizing, correlation discounting, Value-at-Risk and the
//! self-adapting per-trade risk budget

mod controller;
mod position;
mod shared;
mod types;

pub use controller::RiskController;
pub use position::{Position, PositionBook};
pub use shared::SharedRiskController;
pub use types::{CorrelationMatrix, TradeRecord};

#[cfg(test)]
pub(crate) use position::test_position;
