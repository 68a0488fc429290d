//! Execution against the paper exchange

use riskloop::config::ExecutionConfig;
use riskloop::execution::{
    ExecutionAlgorithm, ExecutionPlan, ExecutionScheduler, MarketReading, OrderSide, OrderState,
    OrderStatus, OrderType, PaperExchange, PlanState,
};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

async fn paper() -> PaperExchange {
    let exchange = PaperExchange::new();
    exchange.set_mark_price("ETH/USDT", dec!(2000)).await;
    exchange
        .set_market_reading(
            "ETH/USDT",
            MarketReading {
                volume: dec!(800),
                average_volume: dec!(1000),
                volatility: dec!(0.02),
                average_volatility: dec!(0.02),
            },
        )
        .await;
    exchange
}

#[tokio::test(start_paused = true)]
async fn test_bracket_on_paper_exchange() {
    let exchange = paper().await;
    let scheduler = ExecutionScheduler::new(Arc::new(exchange.clone()), ExecutionConfig::default());

    let bracket = scheduler
        .place_bracket_order("ETH/USDT", OrderSide::Buy, dec!(2), dec!(1900), dec!(2300))
        .await
        .unwrap();

    match &bracket.entry {
        OrderStatus::Found(entry) => {
            assert_eq!(entry.state, OrderState::Closed);
            assert_eq!(entry.price, Some(dec!(2000)));
        }
        OrderStatus::NotFound => panic!("entry should be visible as a closed order"),
    }
    assert_eq!(exchange.leverage("ETH/USDT").await, Some(1));

    let orders = exchange.orders().await;
    let types: Vec<_> = orders.iter().map(|o| o.order_type).collect();
    assert_eq!(types, vec![OrderType::Market, OrderType::Stop, OrderType::Limit]);
    assert!(orders[1..].iter().all(|o| o.side == OrderSide::Sell));
}

#[tokio::test(start_paused = true)]
async fn test_bracket_without_mark_exhausts_retries() {
    let exchange = PaperExchange::new();
    let config = ExecutionConfig {
        max_retries: 3,
        ..ExecutionConfig::default()
    };
    let scheduler = ExecutionScheduler::new(Arc::new(exchange.clone()), config);

    let result = scheduler
        .place_bracket_order("ETH/USDT", OrderSide::Buy, dec!(1), dec!(1900), dec!(2300))
        .await;

    assert!(result.is_err());
    assert_eq!(exchange.leverage("ETH/USDT").await, Some(1));
    assert!(exchange.orders().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_every_algorithm_fills_plan_on_paper() {
    for algorithm in [
        ExecutionAlgorithm::FixedSchedule,
        ExecutionAlgorithm::FixedInterval,
        ExecutionAlgorithm::Adaptive,
    ] {
        let exchange = paper().await;
        let scheduler =
            ExecutionScheduler::new(Arc::new(exchange.clone()), ExecutionConfig::default());
        let mut plan = ExecutionPlan::new(
            "ETH/USDT",
            OrderSide::Sell,
            dec!(50),
            Duration::from_secs(300),
            algorithm,
        )
        .unwrap();

        tokio_test::assert_ok!(scheduler.execute(&mut plan, &exchange).await);

        assert_eq!(plan.state(), PlanState::Completed, "{algorithm:?}");
        assert_eq!(plan.executed_quantity(), dec!(50), "{algorithm:?}");
        let filled: rust_decimal::Decimal = exchange.fills().await.iter().map(|o| o.quantity).sum();
        assert_eq!(filled, dec!(50), "{algorithm:?}");
    }
}
