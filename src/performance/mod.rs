//! Performance tracking module
//!
//! Equity curve and closed-trade ledger, summarized into return, Sharpe,
//! drawdown and win-rate metrics

mod metrics;
mod shared;
mod tracker;

pub use metrics::{Metric, PerformanceMetrics};
pub use shared::SharedPerformanceTracker;
pub use tracker::{PerformanceError, PerformanceTracker};
