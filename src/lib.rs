//! riskloop: adaptive risk sizing, paced execution and performance feedback
//!
//! This library provides the core components for:
//! - Position sizing under a self-adapting per-trade risk budget
//! - Correlation discounting and portfolio Value-at-Risk
//! - Bracket orders with bounded retry
//! - Fixed-schedule, fixed-interval and adaptive order slicing
//! - Equity curve and trade metrics fed back into risk controls
//! - Structured logging and Prometheus metrics

pub mod cli;
pub mod config;
pub mod execution;
pub mod performance;
pub mod pipeline;
pub mod risk;
pub mod strategy;
pub mod telemetry;
