//! End-to-end feedback loop tests

use riskloop::config::{ExecutionConfig, RiskConfig, TradingConfig};
use riskloop::execution::{
    Exchange, ExecutionAlgorithm, ExecutionScheduler, MarketReading, OrderSide, PaperExchange,
};
use riskloop::performance::{Metric, PerformanceTracker, SharedPerformanceTracker};
use riskloop::pipeline::{IdeaOutcome, TradeIdea, TradingPipeline};
use riskloop::risk::{RiskController, SharedRiskController};
use riskloop::strategy::StrategyKind;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;

const SYMBOLS: [(&str, Decimal); 2] = [("BTC/USDT", dec!(50000)), ("ETH/USDT", dec!(2500))];

async fn setup(trading: TradingConfig) -> (TradingPipeline, PaperExchange) {
    let exchange = PaperExchange::new();
    for (symbol, price) in SYMBOLS {
        exchange.set_mark_price(symbol, price).await;
        exchange
            .set_market_reading(
                symbol,
                MarketReading {
                    volume: dec!(1000),
                    average_volume: dec!(1000),
                    volatility: dec!(0.02),
                    average_volatility: dec!(0.02),
                },
            )
            .await;
    }

    let scheduler = ExecutionScheduler::new(
        Arc::new(exchange.clone()) as Arc<dyn Exchange>,
        ExecutionConfig::default(),
    );
    let risk = RiskConfig {
        max_position_size: dec!(1000000),
        ..RiskConfig::default()
    };
    let pipeline = TradingPipeline::new(
        scheduler,
        Arc::new(exchange.clone()),
        SharedRiskController::new(RiskController::from_config(risk)),
        SharedPerformanceTracker::new(PerformanceTracker::new()),
        trading,
    );
    (pipeline, exchange)
}

fn idea(symbol: &str, entry: Decimal, stop: Decimal) -> TradeIdea {
    TradeIdea {
        symbol: symbol.to_string(),
        strategy: StrategyKind::Breakout,
        side: OrderSide::Buy,
        entry_price: entry,
        stop_loss: stop,
        take_profit: entry * dec!(1.1),
        volatility: dec!(1),
    }
}

#[tokio::test(start_paused = true)]
async fn test_cycle_isolates_failing_symbol() {
    let (pipeline, exchange) = setup(TradingConfig::default()).await;

    let results = pipeline
        .run_cycle(vec![
            idea("BTC/USDT", dec!(50000), dec!(49000)),
            // No mark price on the exchange: every bracket attempt fails
            idea("SOL/USDT", dec!(150), dec!(140)),
        ])
        .await;

    let outcomes: HashMap<_, _> = results.into_iter().collect();
    assert!(outcomes["SOL/USDT"].is_err());
    // risk 100 / diff 1000 / (1 + 1)
    assert_eq!(
        *outcomes["BTC/USDT"].as_ref().unwrap(),
        IdeaOutcome::Opened { size: dec!(0.05) }
    );

    let positions = pipeline.positions().await;
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].symbol, "BTC/USDT");
    assert_eq!(exchange.orders().await.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_sliced_entry_and_close_feed_metrics() {
    let trading = TradingConfig {
        use_bracket: false,
        algorithm: ExecutionAlgorithm::FixedInterval,
        time_window_secs: 100,
        ..TradingConfig::default()
    };
    let (pipeline, exchange) = setup(trading).await;

    let outcome = pipeline
        .process_idea(idea("ETH/USDT", dec!(2500), dec!(2450)))
        .await
        .unwrap();
    // risk 100 / diff 50 / (1 + 1)
    assert_eq!(outcome, IdeaOutcome::Opened { size: dec!(1) });
    assert_eq!(exchange.fills().await.len(), 10);

    let trade = pipeline.close("ETH/USDT", dec!(2750)).await.unwrap().unwrap();
    assert_eq!(trade.profit, dec!(250));
    assert_eq!(trade.return_pct, dec!(0.1));

    let metrics = pipeline.performance().calculate_metrics().await;
    assert_eq!(metrics.total_trades, 1);
    assert_eq!(metrics.win_rate, dec!(1));
    assert_eq!(metrics.total_return, Metric::InsufficientData);
    assert_eq!(pipeline.risk().history_len().await, 1);
    assert!(pipeline.positions().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_risk_budget_adapts_across_cycles() {
    let (pipeline, _exchange) = setup(TradingConfig::default()).await;

    pipeline
        .process_idea(idea("BTC/USDT", dec!(50000), dec!(49000)))
        .await
        .unwrap();

    // No full lookback yet: shrink by 10%, then scale by volatility 1
    assert_eq!(pipeline.risk().risk_per_trade().await, dec!(90));
}
