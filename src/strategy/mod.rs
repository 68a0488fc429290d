//! Strategy module
//!
//! Closed set of strategy kinds behind a single signal interface

mod generator;
mod types;

pub use generator::{SignalGenerator, StrategyError};
pub use types::{MarketSnapshot, Signal, SignalAction, StrategyKind};
