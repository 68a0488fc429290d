//! Execution plans and their lifecycle

use super::{ExecutionError, OrderRecord, OrderSide};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Pacing algorithm for a sliced order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionAlgorithm {
    /// Equal slices released on a schedule, with catch-up at the deadline ("VWAP-like")
    FixedSchedule,
    /// Equal slices at fixed spacing, unconditionally ("TWAP-like")
    FixedInterval,
    /// Slices sized from live volume and volatility
    Adaptive,
}

impl std::str::FromStr for ExecutionAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed_schedule" | "vwap" => Ok(Self::FixedSchedule),
            "fixed_interval" | "twap" => Ok(Self::FixedInterval),
            "adaptive" => Ok(Self::Adaptive),
            other => Err(format!("unknown algorithm: {other}")),
        }
    }
}

/// Plan lifecycle
///
/// `Pending -> Retrying -> Active -> {Completed | Aborted}`; `Retrying` is
/// only entered by bracket placement and may repeat once per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanState {
    Pending,
    Retrying { attempt: u32 },
    Active,
    Completed,
    Aborted,
}

impl PlanState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PlanState::Completed | PlanState::Aborted)
    }

    fn can_transition_to(self, next: PlanState) -> bool {
        use PlanState::*;
        match (self, next) {
            (Pending, Retrying { attempt }) => attempt == 1,
            (Retrying { attempt: from }, Retrying { attempt: to }) => to == from + 1,
            (Pending | Retrying { .. }, Active) => true,
            (Active, Completed) => true,
            (Pending | Retrying { .. } | Active, Aborted) => true,
            _ => false,
        }
    }
}

/// Cooperative cancellation shared between a caller and a running plan
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; honoured at the next suspension point
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A request to fill `total_quantity` of a symbol within a time window
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub total_quantity: Decimal,
    pub time_window: Duration,
    pub algorithm: ExecutionAlgorithm,
    executed_quantity: Decimal,
    start_time: Option<Instant>,
    state: PlanState,
    fills: Vec<OrderRecord>,
}

impl ExecutionPlan {
    /// Create a pending plan
    pub fn new(
        symbol: impl Into<String>,
        side: OrderSide,
        total_quantity: Decimal,
        time_window: Duration,
        algorithm: ExecutionAlgorithm,
    ) -> Result<Self, ExecutionError> {
        if total_quantity <= Decimal::ZERO {
            return Err(ExecutionError::InvalidPlan(format!(
                "total quantity must be positive, got {total_quantity}"
            )));
        }
        if time_window.is_zero() {
            return Err(ExecutionError::InvalidPlan(
                "time window must be positive".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            side,
            total_quantity,
            time_window,
            algorithm,
            executed_quantity: Decimal::ZERO,
            start_time: None,
            state: PlanState::Pending,
            fills: vec![],
        })
    }

    /// Quantity filled so far
    pub fn executed_quantity(&self) -> Decimal {
        self.executed_quantity
    }

    /// Quantity still to fill (negative after an adaptive overshoot)
    pub fn remaining_quantity(&self) -> Decimal {
        self.total_quantity - self.executed_quantity
    }

    pub fn state(&self) -> PlanState {
        self.state
    }

    /// Orders placed for this plan, in placement order
    pub fn fills(&self) -> &[OrderRecord] {
        &self.fills
    }

    /// Time since the plan became active
    pub fn elapsed(&self) -> Duration {
        self.start_time
            .map(|start| start.elapsed())
            .unwrap_or_default()
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow
    pub fn transition_to(&mut self, next: PlanState) -> Result<(), ExecutionError> {
        if !self.state.can_transition_to(next) {
            return Err(ExecutionError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        if next == PlanState::Active && self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
        self.state = next;
        Ok(())
    }

    /// Abort unless already terminal
    pub(crate) fn abort(&mut self) {
        if !self.state.is_terminal() {
            self.state = PlanState::Aborted;
        }
    }

    pub(crate) fn record_fill(&mut self, quantity: Decimal, order: OrderRecord) {
        self.executed_quantity += quantity;
        self.fills.push(order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_plan() -> ExecutionPlan {
        ExecutionPlan::new(
            "BTC/USDT",
            OrderSide::Buy,
            dec!(100),
            Duration::from_secs(100),
            ExecutionAlgorithm::FixedInterval,
        )
        .unwrap()
    }

    #[test]
    fn test_new_plan_is_pending() {
        let plan = make_plan();
        assert_eq!(plan.state(), PlanState::Pending);
        assert_eq!(plan.executed_quantity(), dec!(0));
        assert_eq!(plan.remaining_quantity(), dec!(100));
        assert_eq!(plan.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_counts_from_activation() {
        let mut plan = make_plan();
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(plan.elapsed(), Duration::ZERO);

        plan.transition_to(PlanState::Active).unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(plan.elapsed(), Duration::from_secs(10));
    }

    #[test]
    fn test_rejects_non_positive_quantity() {
        let result = ExecutionPlan::new(
            "BTC/USDT",
            OrderSide::Buy,
            dec!(0),
            Duration::from_secs(10),
            ExecutionAlgorithm::Adaptive,
        );
        assert!(matches!(result, Err(ExecutionError::InvalidPlan(_))));
    }

    #[test]
    fn test_rejects_empty_window() {
        let result = ExecutionPlan::new(
            "BTC/USDT",
            OrderSide::Buy,
            dec!(1),
            Duration::ZERO,
            ExecutionAlgorithm::Adaptive,
        );
        assert!(matches!(result, Err(ExecutionError::InvalidPlan(_))));
    }

    #[test]
    fn test_lifecycle_through_retries() {
        let mut plan = make_plan();
        plan.transition_to(PlanState::Retrying { attempt: 1 }).unwrap();
        plan.transition_to(PlanState::Retrying { attempt: 2 }).unwrap();
        plan.transition_to(PlanState::Active).unwrap();
        plan.transition_to(PlanState::Completed).unwrap();
        assert!(plan.state().is_terminal());
    }

    #[test]
    fn test_invalid_transitions() {
        let mut plan = make_plan();
        assert!(plan.transition_to(PlanState::Completed).is_err());
        assert!(plan.transition_to(PlanState::Retrying { attempt: 2 }).is_err());

        plan.transition_to(PlanState::Active).unwrap();
        assert!(plan.transition_to(PlanState::Retrying { attempt: 1 }).is_err());

        plan.transition_to(PlanState::Aborted).unwrap();
        assert!(plan.transition_to(PlanState::Active).is_err());
    }

    #[test]
    fn test_abort_keeps_terminal_state() {
        let mut plan = make_plan();
        plan.transition_to(PlanState::Active).unwrap();
        plan.transition_to(PlanState::Completed).unwrap();
        plan.abort();
        assert_eq!(plan.state(), PlanState::Completed);
    }

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!(
            "twap".parse::<ExecutionAlgorithm>(),
            Ok(ExecutionAlgorithm::FixedInterval)
        );
        assert_eq!(
            "VWAP".parse::<ExecutionAlgorithm>(),
            Ok(ExecutionAlgorithm::FixedSchedule)
        );
        assert_eq!(
            "adaptive".parse::<ExecutionAlgorithm>(),
            Ok(ExecutionAlgorithm::Adaptive)
        );
        assert!("iceberg".parse::<ExecutionAlgorithm>().is_err());
    }

    #[test]
    fn test_cancellation_flag_shared() {
        let flag = CancellationFlag::new();
        let clone = flag.clone();
        clone.cancel();
        assert!(flag.is_cancelled());
    }
}
