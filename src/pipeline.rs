//! Trading pipeline
//!
//! Wires risk sizing, execution and performance tracking into one loop:
//! each trade idea is sized, executed, recorded as a position, and then
//! fed back into the equity curve and the risk budget.

use crate::config::TradingConfig;
use crate::execution::{ExecutionPlan, ExecutionScheduler, MarketProbe, OrderSide};
use crate::performance::SharedPerformanceTracker;
use crate::risk::{CorrelationMatrix, Position, PositionBook, SharedRiskController, TradeRecord};
use crate::strategy::{MarketSnapshot, Signal, StrategyKind};
use crate::telemetry::{increment, set_gauge, CounterMetric, GaugeMetric};
use anyhow::Context;
use chrono::Utc;
use futures_util::future::join_all;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// A sized-but-not-yet-executed entry
#[derive(Debug, Clone, PartialEq)]
pub struct TradeIdea {
    pub symbol: String,
    pub strategy: StrategyKind,
    pub side: OrderSide,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    /// Recent return volatility of the symbol
    pub volatility: Decimal,
}

impl TradeIdea {
    /// Build an idea from a strategy signal; `None` for non-entry actions
    pub fn from_signal(
        strategy: StrategyKind,
        snapshot: &MarketSnapshot,
        signal: &Signal,
    ) -> Option<Self> {
        let side = signal.action.entry_side()?;
        Some(Self {
            symbol: snapshot.symbol.clone(),
            strategy,
            side,
            entry_price: snapshot.last_price,
            stop_loss: signal.stop_loss,
            take_profit: signal.take_profit,
            volatility: snapshot.volatility,
        })
    }
}

/// What happened to one idea
#[derive(Debug, Clone, PartialEq)]
pub enum IdeaOutcome {
    /// A position of `size` was opened
    Opened { size: Decimal },
    /// Sizing left nothing to trade
    Skipped { size: Decimal },
}

/// Sizes, executes and tracks trade ideas
pub struct TradingPipeline {
    scheduler: ExecutionScheduler,
    probe: Arc<dyn MarketProbe>,
    risk: SharedRiskController,
    performance: SharedPerformanceTracker,
    positions: Arc<RwLock<PositionBook>>,
    latest_prices: Arc<RwLock<HashMap<String, Decimal>>>,
    correlations: CorrelationMatrix,
    trading: TradingConfig,
}

impl TradingPipeline {
    pub fn new(
        scheduler: ExecutionScheduler,
        probe: Arc<dyn MarketProbe>,
        risk: SharedRiskController,
        performance: SharedPerformanceTracker,
        trading: TradingConfig,
    ) -> Self {
        Self {
            scheduler,
            probe,
            risk,
            performance,
            positions: Arc::new(RwLock::new(PositionBook::new())),
            latest_prices: Arc::new(RwLock::new(HashMap::new())),
            correlations: CorrelationMatrix::new(),
            trading,
        }
    }

    /// Use a correlation matrix when discounting new entries
    pub fn with_correlations(mut self, correlations: CorrelationMatrix) -> Self {
        self.correlations = correlations;
        self
    }

    pub fn risk(&self) -> &SharedRiskController {
        &self.risk
    }

    pub fn performance(&self) -> &SharedPerformanceTracker {
        &self.performance
    }

    /// Open positions in insertion order
    pub async fn positions(&self) -> Vec<Position> {
        self.positions.read().await.positions().to_vec()
    }

    /// Size and execute one idea, then update performance and risk
    pub async fn process_idea(&self, idea: TradeIdea) -> anyhow::Result<IdeaOutcome> {
        self.latest_prices
            .write()
            .await
            .insert(idea.symbol.clone(), idea.entry_price);

        let open_positions = self.positions().await;
        let size = self
            .risk
            .size_with_correlation(
                &idea.symbol,
                idea.entry_price,
                idea.stop_loss,
                &open_positions,
                idea.volatility,
                &self.correlations,
            )
            .await;

        let outcome = if size > Decimal::ZERO {
            let filled = self.execute(&idea, size).await?;
            self.positions.write().await.open(Position {
                symbol: idea.symbol.clone(),
                side: idea.side,
                size: filled,
                entry_price: idea.entry_price,
                stop_loss: idea.stop_loss,
                take_profit: idea.take_profit,
                strategy: idea.strategy,
                opened_at: Utc::now(),
            });
            info!(
                symbol = %idea.symbol,
                side = %idea.side,
                strategy = %idea.strategy,
                size = %filled,
                entry = %idea.entry_price,
                stop_loss = %idea.stop_loss,
                take_profit = %idea.take_profit,
                "Position opened"
            );
            IdeaOutcome::Opened { size: filled }
        } else {
            info!(symbol = %idea.symbol, %size, "Position size not positive, skipping");
            IdeaOutcome::Skipped { size }
        };

        self.refresh(&idea.symbol, idea.volatility).await?;
        Ok(outcome)
    }

    async fn execute(&self, idea: &TradeIdea, size: Decimal) -> anyhow::Result<Decimal> {
        if self.trading.use_bracket {
            self.scheduler
                .place_bracket_order(&idea.symbol, idea.side, size, idea.stop_loss, idea.take_profit)
                .await
                .with_context(|| format!("bracket order for {}", idea.symbol))?;
            return Ok(size);
        }

        let mut plan = ExecutionPlan::new(
            idea.symbol.clone(),
            idea.side,
            size,
            Duration::from_secs(self.trading.time_window_secs),
            self.trading.algorithm,
        )?;
        self.scheduler
            .execute(&mut plan, self.probe.as_ref())
            .await
            .with_context(|| format!("{:?} plan for {}", plan.algorithm, idea.symbol))?;
        Ok(plan.executed_quantity())
    }

    /// Sample equity, adapt the risk budget and log portfolio VaR
    async fn refresh(&self, symbol: &str, volatility: Decimal) -> anyhow::Result<()> {
        let open_positions = self.positions().await;
        let prices = self.latest_prices.read().await.clone();

        self.performance
            .update(&open_positions, &prices)
            .await
            .context("equity update")?;
        self.risk.update_risk_parameters(volatility).await;

        let volatilities = vec![volatility.to_f64().unwrap_or(0.0); open_positions.len()];
        let var = self.risk.calculate_var(&open_positions, &volatilities).await;
        set_gauge(GaugeMetric::OpenPositions, open_positions.len() as f64);
        info!(symbol, %var, positions = open_positions.len(), "Current Value at Risk");
        Ok(())
    }

    /// Exit a position at `exit_price` and feed the trade back
    ///
    /// Returns `None` when no position is held in the symbol.
    pub async fn close(&self, symbol: &str, exit_price: Decimal) -> anyhow::Result<Option<TradeRecord>> {
        let Some(position) = self.positions.read().await.get(symbol).cloned() else {
            warn!(symbol, "No open position to close");
            return Ok(None);
        };

        self.scheduler
            .close_position(symbol, position.side, position.size)
            .await
            .with_context(|| format!("closing {symbol}"))?;

        let closed = self.positions.write().await.close(symbol, exit_price);
        let Some((_, trade)) = closed else {
            return Ok(None);
        };
        self.latest_prices
            .write()
            .await
            .insert(symbol.to_string(), exit_price);

        self.risk.record_trade(trade.clone()).await;
        self.performance.record_trade(trade.clone()).await;
        increment(CounterMetric::TradesClosed);
        info!(symbol, profit = %trade.profit, return_pct = %trade.return_pct, "Position closed");
        Ok(Some(trade))
    }

    /// Process every idea concurrently
    ///
    /// A failing idea is logged and reported in the result; the others
    /// keep running.
    pub async fn run_cycle(&self, ideas: Vec<TradeIdea>) -> Vec<(String, anyhow::Result<IdeaOutcome>)> {
        let tasks = ideas.into_iter().map(|idea| async move {
            let symbol = idea.symbol.clone();
            let result = self.process_idea(idea).await;
            if let Err(e) = &result {
                error!(symbol = %symbol, error = %format!("{e:#}"), "Error processing symbol");
            }
            (symbol, result)
        });
        join_all(tasks).await
    }
}
