//! Configuration types for riskloop

use crate::execution::ExecutionAlgorithm;
use crate::telemetry::LogFormat;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Configuration rejected by [`Config::validate`]
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("risk.risk_per_trade must be positive, got {0}")]
    NonPositiveRisk(Decimal),
    #[error("risk.max_risk_per_trade ({max}) is below risk.risk_per_trade ({risk})")]
    MaxRiskBelowRisk { risk: Decimal, max: Decimal },
    #[error("risk.lookback_period must be at least 1")]
    EmptyLookback,
    #[error("risk.var_confidence must lie strictly between 0 and 1, got {0}")]
    ConfidenceOutOfRange(f64),
    #[error("risk.max_position_size must be positive, got {0}")]
    NonPositiveMaxPosition(Decimal),
    #[error("execution.max_retries must be at least 1")]
    NoRetryBudget,
    #[error("execution.slices must be at least 1")]
    NoSlices,
    #[error("trading.time_window_secs must be positive")]
    EmptyTimeWindow,
}

/// Risk budget consumed by the risk controller
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RiskConfig {
    /// Currency amount risked per trade at start-up
    #[serde(default = "default_risk_per_trade")]
    pub risk_per_trade: Decimal,
    /// Ceiling applied when the risk budget grows after profitable trades
    #[serde(default = "default_max_risk_per_trade")]
    pub max_risk_per_trade: Decimal,
    /// Number of recent trades kept for adaptation
    #[serde(default = "default_lookback_period")]
    pub lookback_period: usize,
    /// Confidence level for Value-at-Risk (e.g. 0.95)
    #[serde(default = "default_var_confidence")]
    pub var_confidence: f64,
    /// Maximum total notional across open positions
    #[serde(default = "default_max_position_size")]
    pub max_position_size: Decimal,
}

fn default_risk_per_trade() -> Decimal {
    Decimal::new(100, 0)
}
fn default_max_risk_per_trade() -> Decimal {
    Decimal::new(500, 0)
}
fn default_lookback_period() -> usize {
    20
}
fn default_var_confidence() -> f64 {
    0.95
}
fn default_max_position_size() -> Decimal {
    Decimal::new(10_000, 0)
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_per_trade: default_risk_per_trade(),
            max_risk_per_trade: default_max_risk_per_trade(),
            lookback_period: default_lookback_period(),
            var_confidence: default_var_confidence(),
            max_position_size: default_max_position_size(),
        }
    }
}

/// Exchange call pacing and retry policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Leverage set before every bracket attempt
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    /// Total bracket attempts before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed delay between bracket attempts
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Wait after the three bracket legs before the status lookup
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,
    /// Polling tick of the fixed-schedule algorithm
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Sampling interval of the adaptive algorithm
    #[serde(default = "default_adaptive_interval_secs")]
    pub adaptive_interval_secs: u64,
    /// Number of slices for the fixed-schedule and fixed-interval algorithms
    #[serde(default = "default_slices")]
    pub slices: u32,
}

fn default_leverage() -> u32 {
    1
}
fn default_max_retries() -> u32 {
    5
}
fn default_retry_delay_secs() -> u64 {
    60
}
fn default_settle_delay_secs() -> u64 {
    5
}
fn default_poll_interval_secs() -> u64 {
    1
}
fn default_adaptive_interval_secs() -> u64 {
    60
}
fn default_slices() -> u32 {
    10
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            leverage: default_leverage(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            settle_delay_secs: default_settle_delay_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            adaptive_interval_secs: default_adaptive_interval_secs(),
            slices: default_slices(),
        }
    }
}

/// How trade ideas are turned into orders
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TradingConfig {
    /// Symbols processed each cycle
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Place entries as bracket orders instead of sliced plans
    #[serde(default = "default_true")]
    pub use_bracket: bool,
    /// Slicing algorithm used when brackets are disabled
    #[serde(default = "default_algorithm")]
    pub algorithm: ExecutionAlgorithm,
    /// Window for sliced plans
    #[serde(default = "default_time_window_secs")]
    pub time_window_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_algorithm() -> ExecutionAlgorithm {
    ExecutionAlgorithm::Adaptive
}
fn default_time_window_secs() -> u64 {
    300
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            symbols: vec![],
            use_bracket: true,
            algorithm: default_algorithm(),
            time_window_secs: default_time_window_secs(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus exporter port; no exporter when unset
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the bounds the core relies on but never re-checks itself
    pub fn validate(&self) -> Result<(), ConfigError> {
        let risk = &self.risk;
        if risk.risk_per_trade <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveRisk(risk.risk_per_trade));
        }
        if risk.max_risk_per_trade < risk.risk_per_trade {
            return Err(ConfigError::MaxRiskBelowRisk {
                risk: risk.risk_per_trade,
                max: risk.max_risk_per_trade,
            });
        }
        if risk.lookback_period == 0 {
            return Err(ConfigError::EmptyLookback);
        }
        if !(risk.var_confidence > 0.0 && risk.var_confidence < 1.0) {
            return Err(ConfigError::ConfidenceOutOfRange(risk.var_confidence));
        }
        if risk.max_position_size <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveMaxPosition(risk.max_position_size));
        }
        if self.execution.max_retries == 0 {
            return Err(ConfigError::NoRetryBudget);
        }
        if self.execution.slices == 0 {
            return Err(ConfigError::NoSlices);
        }
        if self.trading.time_window_secs == 0 {
            return Err(ConfigError::EmptyTimeWindow);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            [risk]
            risk_per_trade = 50
            max_risk_per_trade = 200
            lookback_period = 10
            var_confidence = 0.99
            max_position_size = 25000

            [execution]
            leverage = 3
            max_retries = 4
            retry_delay_secs = 30

            [trading]
            symbols = ["BTC/USDT", "ETH/USDT"]
            use_bracket = false
            algorithm = "fixed_interval"
            time_window_secs = 600

            [telemetry]
            log_level = "debug"
            log_format = "json"
            metrics_port = 9090
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.risk.risk_per_trade, dec!(50));
        assert_eq!(config.risk.lookback_period, 10);
        assert_eq!(config.execution.leverage, 3);
        assert_eq!(config.execution.settle_delay_secs, 5);
        assert_eq!(config.trading.algorithm, ExecutionAlgorithm::FixedInterval);
        assert_eq!(config.trading.symbols.len(), 2);
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
        assert_eq!(config.telemetry.metrics_port, Some(9090));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.risk.risk_per_trade, dec!(100));
        assert_eq!(config.execution.max_retries, 5);
        assert_eq!(config.execution.retry_delay_secs, 60);
        assert_eq!(config.execution.slices, 10);
        assert!(config.trading.use_bracket);
        assert!(config.telemetry.metrics_port.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_max_below_risk() {
        let mut config = Config::default();
        config.risk.max_risk_per_trade = dec!(10);
        assert_eq!(
            config.validate(),
            Err(ConfigError::MaxRiskBelowRisk {
                risk: dec!(100),
                max: dec!(10)
            })
        );
    }

    #[test]
    fn test_validate_rejects_confidence_bounds() {
        let mut config = Config::default();
        config.risk.var_confidence = 1.0;
        assert_eq!(config.validate(), Err(ConfigError::ConfidenceOutOfRange(1.0)));
        config.risk.var_confidence = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_lookback_and_retries() {
        let mut config = Config::default();
        config.risk.lookback_period = 0;
        assert_eq!(config.validate(), Err(ConfigError::EmptyLookback));

        let mut config = Config::default();
        config.execution.max_retries = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoRetryBudget));
    }

    #[test]
    fn test_config_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[risk]\nrisk_per_trade = 25\nmax_risk_per_trade = 25").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.risk.risk_per_trade, dec!(25));
        assert_eq!(config.risk.max_risk_per_trade, dec!(25));
    }

    #[test]
    fn test_config_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[risk]\nrisk_per_trade = -1").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }
}
