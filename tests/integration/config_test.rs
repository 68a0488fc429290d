//! Configuration loading tests

use riskloop::config::{Config, ConfigError};
use riskloop::execution::ExecutionAlgorithm;
use riskloop::telemetry::LogFormat;
use rust_decimal_macros::dec;
use std::io::Write;

#[test]
fn test_config_example_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example");
    let config = Config::load(path).unwrap();

    assert_eq!(config.risk.risk_per_trade, dec!(100));
    assert_eq!(config.execution.max_retries, 5);
    assert_eq!(config.trading.algorithm, ExecutionAlgorithm::Adaptive);
    assert_eq!(config.trading.symbols, vec!["BTC/USDT", "ETH/USDT"]);
    assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
    assert!(config.telemetry.metrics_port.is_none());
}

#[test]
fn test_partial_config_uses_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[trading]\nalgorithm = \"fixed_interval\"\nuse_bracket = false").unwrap();

    let config = Config::load(file.path()).unwrap();

    assert_eq!(config.trading.algorithm, ExecutionAlgorithm::FixedInterval);
    assert!(!config.trading.use_bracket);
    assert_eq!(config.execution.slices, 10);
    assert_eq!(config.risk.lookback_period, 20);
}

#[test]
fn test_invalid_config_rejected_on_load() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[risk]\nrisk_per_trade = 600\nmax_risk_per_trade = 500").unwrap();

    let err = Config::load(file.path()).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::MaxRiskBelowRisk {
            risk: dec!(600),
            max: dec!(500)
        })
    );
}

#[test]
fn test_missing_file_is_error() {
    assert!(Config::load("/nonexistent/riskloop.toml").is_err());
}
