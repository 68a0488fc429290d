//! Prometheus metrics
//!
//! Thin wrappers over the `metrics` facade. Calls are no-ops until a
//! recorder is installed by [`super::init_telemetry`].

use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Single order submission
    OrderSubmission,
    /// Full bracket placement including retries
    BracketPlacement,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Current risk budget per trade
    RiskPerTrade,
    /// Last computed portfolio Value-at-Risk
    ValueAtRisk,
    /// Latest equity sample
    Equity,
    /// Quantity executed by the running plan
    ExecutedQuantity,
    /// Open position count
    OpenPositions,
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Failed bracket attempts
    BracketFailures,
    /// Slice orders placed
    SliceOrders,
    /// Slice orders rejected
    SliceFailures,
    /// Trades closed
    TradesClosed,
}

impl LatencyMetric {
    fn name(self) -> &'static str {
        match self {
            LatencyMetric::OrderSubmission => "riskloop_order_submission_latency_ms",
            LatencyMetric::BracketPlacement => "riskloop_bracket_placement_latency_ms",
        }
    }
}

impl GaugeMetric {
    fn name(self) -> &'static str {
        match self {
            GaugeMetric::RiskPerTrade => "riskloop_risk_per_trade",
            GaugeMetric::ValueAtRisk => "riskloop_value_at_risk",
            GaugeMetric::Equity => "riskloop_equity",
            GaugeMetric::ExecutedQuantity => "riskloop_executed_quantity",
            GaugeMetric::OpenPositions => "riskloop_open_positions",
        }
    }
}

impl CounterMetric {
    fn name(self) -> &'static str {
        match self {
            CounterMetric::BracketFailures => "riskloop_bracket_failures_total",
            CounterMetric::SliceOrders => "riskloop_slice_orders_total",
            CounterMetric::SliceFailures => "riskloop_slice_failures_total",
            CounterMetric::TradesClosed => "riskloop_trades_closed_total",
        }
    }
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let value_ms = duration.as_secs_f64() * 1000.0;
    metrics::histogram!(metric.name()).record(value_ms);
    tracing::trace!(metric = metric.name(), value_ms, "Recording latency");
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    metrics::gauge!(metric.name()).set(value);
    tracing::trace!(metric = metric.name(), value, "Setting gauge");
}

/// Bump a counter by one
pub fn increment(metric: CounterMetric) {
    metrics::counter!(metric.name()).increment(1);
}
