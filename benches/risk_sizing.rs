//! Benchmarks for position sizing and Value-at-Risk

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use riskloop::config::RiskConfig;
use riskloop::execution::OrderSide;
use riskloop::risk::{CorrelationMatrix, Position, RiskController, TradeRecord};
use riskloop::strategy::StrategyKind;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

fn portfolio(n: usize) -> Vec<Position> {
    (0..n)
        .map(|i| Position {
            symbol: format!("SYM{i}/USDT"),
            side: OrderSide::Buy,
            size: dec!(1.5),
            entry_price: Decimal::from(100 + i as i64),
            stop_loss: dec!(90),
            take_profit: dec!(130),
            strategy: StrategyKind::Momentum,
            opened_at: Utc::now(),
        })
        .collect()
}

fn correlations(positions: &[Position]) -> CorrelationMatrix {
    let row: HashMap<String, f64> = positions
        .iter()
        .map(|p| (p.symbol.clone(), 0.3))
        .collect();
    HashMap::from([("BTC/USDT".to_string(), row)])
}

fn benchmark_position_size(c: &mut Criterion) {
    let controller = RiskController::from_config(RiskConfig::default());
    let positions = portfolio(20);
    let matrix = correlations(&positions);

    c.bench_function("position_size_with_correlation", |b| {
        b.iter(|| {
            let size = controller.calculate_position_size(
                black_box(dec!(50000)),
                black_box(dec!(49000)),
                &positions,
                black_box(dec!(0.02)),
            );
            controller.adjust_for_correlation(size, "BTC/USDT", &positions, &matrix)
        })
    });
}

fn benchmark_var(c: &mut Criterion) {
    let controller = RiskController::from_config(RiskConfig::default());
    let positions = portfolio(50);
    let volatilities = vec![0.02; positions.len()];

    c.bench_function("portfolio_var_50", |b| {
        b.iter(|| controller.calculate_var(black_box(&positions), black_box(&volatilities)))
    });
}

fn benchmark_update_risk(c: &mut Criterion) {
    let mut controller = RiskController::from_config(RiskConfig::default());
    for i in 0..20 {
        let profit = Decimal::from(i % 3 - 1);
        controller.record_trade(TradeRecord::new(profit, profit / dec!(100)));
    }

    c.bench_function("update_risk_parameters", |b| {
        b.iter(|| controller.clone().update_risk_parameters(black_box(dec!(0.02))))
    });
}

criterion_group!(
    benches,
    benchmark_position_size,
    benchmark_var,
    benchmark_update_risk
);
criterion_main!(benches);
