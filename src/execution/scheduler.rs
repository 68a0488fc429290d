//! Execution scheduler
//!
//! Places bracket orders with a fixed-delay retry and paces sliced plans.
//! All waits are `tokio::time::sleep` so a pacing plan only suspends its
//! own task. Steps within one plan are strictly sequential.

use super::{
    BracketOrder, CancellationFlag, Exchange, ExchangeError, ExecutionAlgorithm, ExecutionError,
    ExecutionPlan, MarketProbe, OrderId, OrderRecord, OrderRequest, OrderSide, OrderStatus,
    PlanState,
};
use crate::config::ExecutionConfig;
use crate::telemetry::{increment, record_latency, set_gauge, CounterMetric, GaugeMetric, LatencyMetric};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

/// Turns sized orders into paced exchange calls
#[derive(Clone)]
pub struct ExecutionScheduler {
    exchange: Arc<dyn Exchange>,
    config: ExecutionConfig,
    cancellation: Option<CancellationFlag>,
}

impl ExecutionScheduler {
    /// Create a scheduler for an exchange connection
    pub fn new(exchange: Arc<dyn Exchange>, config: ExecutionConfig) -> Self {
        Self {
            exchange,
            config,
            cancellation: None,
        }
    }

    /// Stop sliced plans at their next suspension point once `flag` is set
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = Some(flag);
        self
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Place entry, stop-loss and take-profit legs, retrying the whole sequence
    ///
    /// Any failure restarts from the entry leg after `retry_delay_secs`, so a
    /// retry can duplicate an entry that already filled. Legs are not
    /// compensated when a later leg fails. Every error kind is retried.
    pub async fn place_bracket_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> Result<BracketOrder, ExecutionError> {
        self.run_bracket(symbol, side, quantity, stop_loss, take_profit, None)
            .await
    }

    /// Place a bracket for a whole plan, tracking attempts on its lifecycle
    ///
    /// On success the entry counts as the full plan quantity.
    pub async fn execute_bracket(
        &self,
        plan: &mut ExecutionPlan,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> Result<BracketOrder, ExecutionError> {
        let symbol = plan.symbol.clone();
        let (side, quantity) = (plan.side, plan.total_quantity);

        let bracket = self
            .run_bracket(&symbol, side, quantity, stop_loss, take_profit, Some(&mut *plan))
            .await?;

        plan.transition_to(PlanState::Active)?;
        let entry = bracket.entry.record().cloned().unwrap_or_else(|| OrderRecord {
            id: OrderId::new(),
            symbol: symbol.clone(),
            side,
            order_type: super::OrderType::Market,
            quantity,
            price: None,
            stop_price: None,
            state: super::OrderState::Closed,
            created_at: chrono::Utc::now(),
        });
        plan.record_fill(quantity, entry);
        plan.transition_to(PlanState::Completed)?;
        Ok(bracket)
    }

    async fn run_bracket(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
        mut plan: Option<&mut ExecutionPlan>,
    ) -> Result<BracketOrder, ExecutionError> {
        let max_attempts = self.config.max_retries.max(1);
        let retry_delay = Duration::from_secs(self.config.retry_delay_secs);
        let started = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;
            if let Some(plan) = plan.as_deref_mut() {
                plan.transition_to(PlanState::Retrying { attempt })?;
            }

            match self
                .bracket_attempt(symbol, side, quantity, stop_loss, take_profit)
                .await
            {
                Ok((entry, stop_loss_order, take_profit_order)) => {
                    record_latency(LatencyMetric::BracketPlacement, started.elapsed());
                    return Ok(BracketOrder {
                        entry,
                        stop_loss: stop_loss_order,
                        take_profit: take_profit_order,
                        attempts: attempt,
                    });
                }
                Err(err) => {
                    increment(CounterMetric::BracketFailures);
                    error!(
                        symbol,
                        attempt,
                        max_attempts,
                        transient = err.is_transient(),
                        error = %err,
                        "Bracket attempt failed"
                    );

                    if attempt >= max_attempts {
                        error!(symbol, attempts = attempt, "Max retries reached");
                        if let Some(plan) = plan.as_deref_mut() {
                            plan.abort();
                        }
                        return Err(ExecutionError::RetriesExhausted {
                            symbol: symbol.to_string(),
                            attempts: attempt,
                            last_error: err,
                        });
                    }
                    sleep(retry_delay).await;
                }
            }
        }
    }

    async fn bracket_attempt(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> Result<(OrderStatus, OrderRecord, OrderRecord), ExchangeError> {
        self.exchange
            .set_leverage(self.config.leverage, symbol)
            .await?;

        let entry = self
            .exchange
            .create_order(OrderRequest::market(symbol, side, quantity))
            .await?;
        info!(symbol, order_id = %entry.id, %side, %quantity, "Entry order placed");

        let exit_side = side.opposite();
        let stop_loss_order = self
            .exchange
            .create_order(OrderRequest::stop_loss(symbol, exit_side, quantity, stop_loss))
            .await?;
        info!(symbol, order_id = %stop_loss_order.id, stop_price = %stop_loss, "Stop loss order placed");

        let take_profit_order = self
            .exchange
            .create_order(OrderRequest::take_profit(symbol, exit_side, quantity, take_profit))
            .await?;
        info!(symbol, order_id = %take_profit_order.id, price = %take_profit, "Take profit order placed");

        sleep(Duration::from_secs(self.config.settle_delay_secs)).await;

        let entry_status = self.fetch_order_status(&entry.id, symbol).await?;
        Ok((entry_status, stop_loss_order, take_profit_order))
    }

    /// Find an order among open orders, then closed orders
    ///
    /// An order in neither list is reported as [`OrderStatus::NotFound`].
    pub async fn fetch_order_status(
        &self,
        order_id: &str,
        symbol: &str,
    ) -> Result<OrderStatus, ExchangeError> {
        let open_orders = self.exchange.fetch_open_orders(symbol).await?;
        debug!(symbol, count = open_orders.len(), "Fetched open orders");
        if let Some(order) = open_orders.into_iter().find(|o| o.id == order_id) {
            return Ok(OrderStatus::Found(order));
        }

        let closed_orders = self.exchange.fetch_closed_orders(symbol).await?;
        debug!(symbol, count = closed_orders.len(), "Fetched closed orders");
        if let Some(order) = closed_orders.into_iter().find(|o| o.id == order_id) {
            return Ok(OrderStatus::Found(order));
        }

        warn!(symbol, order_id, "Order not found in open or closed orders");
        Ok(OrderStatus::NotFound)
    }

    /// Close a position with a single market order on the opposite side
    pub async fn close_position(
        &self,
        symbol: &str,
        position_side: OrderSide,
        size: Decimal,
    ) -> Result<OrderRecord, ExchangeError> {
        let order = self
            .exchange
            .create_order(OrderRequest::market(symbol, position_side.opposite(), size))
            .await
            .inspect_err(|e| error!(symbol, error = %e, "Error closing position"))?;
        info!(symbol, order_id = %order.id, %size, "Position closed");
        Ok(order)
    }

    /// Run a plan with the algorithm it names
    ///
    /// `probe` is only consulted by the adaptive algorithm.
    pub async fn execute(
        &self,
        plan: &mut ExecutionPlan,
        probe: &dyn MarketProbe,
    ) -> Result<(), ExecutionError> {
        match plan.algorithm {
            ExecutionAlgorithm::FixedSchedule => self.run_fixed_schedule(plan).await,
            ExecutionAlgorithm::FixedInterval => self.run_fixed_interval(plan).await,
            ExecutionAlgorithm::Adaptive => self.run_adaptive(plan, probe).await,
        }
    }

    /// Release equal slices on a schedule, catching up at the deadline
    ///
    /// Each poll places the next slice once elapsed time passes its
    /// boundary. At the end of the window whatever remains is placed in a
    /// single order, so the slices always sum to the plan total.
    pub async fn run_fixed_schedule(&self, plan: &mut ExecutionPlan) -> Result<(), ExecutionError> {
        let (slices, slice_size) = self.equal_slices(plan)?;
        plan.transition_to(PlanState::Active)?;

        let interval = plan.time_window / slices;
        let poll_interval = Duration::from_secs(self.config.poll_interval_secs);

        info!(
            plan_id = %plan.id,
            symbol = %plan.symbol,
            total = %plan.total_quantity,
            slices,
            "Starting fixed-schedule execution"
        );

        while plan.executed_quantity() < plan.total_quantity {
            self.check_cancelled(plan)?;

            let elapsed = plan.elapsed();
            if elapsed >= plan.time_window {
                let remaining = plan.remaining_quantity();
                debug!(plan_id = %plan.id, %remaining, "Window elapsed, placing remainder");
                self.place_slice(plan, remaining).await?;
                break;
            }

            let next_slice = (plan.executed_quantity() / slice_size)
                .floor()
                .to_u32()
                .unwrap_or(u32::MAX)
                .saturating_add(1);
            let due = interval
                .checked_mul(next_slice)
                .is_some_and(|boundary| elapsed >= boundary);
            if due {
                let quantity = slice_size.min(plan.remaining_quantity());
                self.place_slice(plan, quantity).await?;
            }

            sleep(poll_interval).await;
        }

        self.complete(plan)
    }

    /// Place equal slices at fixed spacing regardless of market state
    ///
    /// The last slice takes whatever remains, so an uneven split still
    /// fills the plan total.
    pub async fn run_fixed_interval(&self, plan: &mut ExecutionPlan) -> Result<(), ExecutionError> {
        let (slices, slice_size) = self.equal_slices(plan)?;
        plan.transition_to(PlanState::Active)?;

        let interval = plan.time_window / slices;

        info!(
            plan_id = %plan.id,
            symbol = %plan.symbol,
            total = %plan.total_quantity,
            slices,
            "Starting fixed-interval execution"
        );

        for index in 0..slices {
            self.check_cancelled(plan)?;
            let quantity = if index + 1 == slices {
                plan.remaining_quantity()
            } else {
                slice_size
            };
            self.place_slice(plan, quantity).await?;
            if index + 1 < slices {
                sleep(interval).await;
            }
        }

        self.complete(plan)
    }

    /// Size each slice from live volume and volatility
    ///
    /// Slices are not clamped to the remaining quantity, so strong volume
    /// or calm markets can overshoot the plan total before the deadline.
    /// At the deadline the remainder is placed in one order.
    pub async fn run_adaptive(
        &self,
        plan: &mut ExecutionPlan,
        probe: &dyn MarketProbe,
    ) -> Result<(), ExecutionError> {
        let sample_interval = Duration::from_secs(self.config.adaptive_interval_secs);
        let window_minutes = Decimal::try_from(plan.time_window.as_secs_f64() / 60.0)
            .map_err(|e| ExecutionError::InvalidPlan(e.to_string()))?;
        if window_minutes.is_zero() {
            return Err(ExecutionError::InvalidPlan(
                "time window too short for adaptive sizing".to_string(),
            ));
        }
        let base_rate = plan.total_quantity / window_minutes;

        plan.transition_to(PlanState::Active)?;

        info!(
            plan_id = %plan.id,
            symbol = %plan.symbol,
            total = %plan.total_quantity,
            %base_rate,
            "Starting adaptive execution"
        );

        while plan.executed_quantity() < plan.total_quantity {
            self.check_cancelled(plan)?;

            if plan.elapsed() >= plan.time_window {
                let remaining = plan.remaining_quantity();
                debug!(plan_id = %plan.id, %remaining, "Window elapsed, placing remainder");
                self.place_slice(plan, remaining).await?;
                break;
            }

            let sample = self.sample_market(plan, probe).await?;
            let quantity = match sample.slice_quantity(base_rate) {
                Ok(quantity) => quantity,
                Err(err) => {
                    plan.abort();
                    return Err(err);
                }
            };
            if quantity > Decimal::ZERO {
                self.place_slice(plan, quantity).await?;
            } else {
                debug!(plan_id = %plan.id, %quantity, "Adaptive slice empty, skipping");
            }

            sleep(sample_interval).await;
        }

        self.complete(plan)
    }

    async fn sample_market(
        &self,
        plan: &mut ExecutionPlan,
        probe: &dyn MarketProbe,
    ) -> Result<MarketSample, ExecutionError> {
        let symbol = plan.symbol.as_str();
        let sample = async {
            Ok::<_, ExchangeError>(MarketSample {
                volume: probe.current_volume(symbol).await?,
                average_volume: probe.average_volume(symbol).await?,
                volatility: probe.current_volatility(symbol).await?,
                average_volatility: probe.average_volatility(symbol).await?,
            })
        }
        .await;

        match sample {
            Ok(sample) => Ok(sample),
            Err(source) => {
                let symbol = symbol.to_string();
                plan.abort();
                Err(ExecutionError::Probe { symbol, source })
            }
        }
    }

    async fn place_slice(
        &self,
        plan: &mut ExecutionPlan,
        quantity: Decimal,
    ) -> Result<(), ExecutionError> {
        let started = Instant::now();
        let request = OrderRequest::market(&plan.symbol, plan.side, quantity);

        match self.exchange.create_order(request).await {
            Ok(order) => {
                record_latency(LatencyMetric::OrderSubmission, started.elapsed());
                increment(CounterMetric::SliceOrders);
                info!(
                    plan_id = %plan.id,
                    symbol = %plan.symbol,
                    %quantity,
                    price = ?order.price,
                    "Executed slice"
                );
                plan.record_fill(quantity, order);
                set_gauge(
                    GaugeMetric::ExecutedQuantity,
                    plan.executed_quantity().to_f64().unwrap_or(0.0),
                );
                Ok(())
            }
            Err(source) => {
                increment(CounterMetric::SliceFailures);
                error!(
                    plan_id = %plan.id,
                    symbol = %plan.symbol,
                    %quantity,
                    executed = %plan.executed_quantity(),
                    error = %source,
                    "Error placing slice, aborting plan"
                );
                plan.abort();
                Err(ExecutionError::SliceFailed {
                    symbol: plan.symbol.clone(),
                    quantity,
                    executed: plan.executed_quantity(),
                    source,
                })
            }
        }
    }

    /// Slice count and size for the equal-slice algorithms
    ///
    /// Aborts the plan when the total is too small to split at Decimal
    /// precision.
    fn equal_slices(&self, plan: &mut ExecutionPlan) -> Result<(u32, Decimal), ExecutionError> {
        let slices = self.config.slices.max(1);
        let slice_size = plan.total_quantity / Decimal::from(slices);
        if slice_size.is_zero() {
            plan.abort();
            return Err(ExecutionError::InvalidPlan(format!(
                "total quantity {} cannot be split into {slices} slices",
                plan.total_quantity
            )));
        }
        Ok((slices, slice_size))
    }

    fn check_cancelled(&self, plan: &mut ExecutionPlan) -> Result<(), ExecutionError> {
        match &self.cancellation {
            Some(flag) if flag.is_cancelled() => {
                warn!(plan_id = %plan.id, executed = %plan.executed_quantity(), "Plan cancelled");
                plan.abort();
                Err(ExecutionError::Cancelled(plan.id))
            }
            _ => Ok(()),
        }
    }

    fn complete(&self, plan: &mut ExecutionPlan) -> Result<(), ExecutionError> {
        plan.transition_to(PlanState::Completed)?;
        info!(
            plan_id = %plan.id,
            symbol = %plan.symbol,
            executed = %plan.executed_quantity(),
            slices = plan.fills().len(),
            "Plan completed"
        );
        Ok(())
    }
}

/// One adaptive reading
#[derive(Debug, Clone, Copy)]
struct MarketSample {
    volume: Decimal,
    average_volume: Decimal,
    volatility: Decimal,
    average_volatility: Decimal,
}

impl MarketSample {
    /// `base_rate * (volume / avg_volume) * (avg_volatility / volatility)`
    fn slice_quantity(&self, base_rate: Decimal) -> Result<Decimal, ExecutionError> {
        if self.average_volume.is_zero() {
            return Err(ExecutionError::InvalidMarketSample(
                "average volume is zero".to_string(),
            ));
        }
        if self.volatility.is_zero() {
            return Err(ExecutionError::InvalidMarketSample(
                "volatility is zero".to_string(),
            ));
        }

        let volume_factor = self.volume / self.average_volume;
        let volatility_factor = self.average_volatility / self.volatility;
        Ok(base_rate * volume_factor * volatility_factor)
    }
}
