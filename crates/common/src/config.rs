use std::path::Path;

use chrono::{DateTime, Utc};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Backtest,
    Live,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignalsConfig {
    pub intervals: Vec<Interval>,
    pub tickers: Vec<String>,
    pub strategies: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_testnet")]
    pub testnet: bool,
    /// Maximum notional per order in USD. Required when `enabled`.
    #[serde(default)]
    pub max_order_size: Option<f64>,
    /// Minimum decision confidence, 0-100. Required when `enabled`.
    #[serde(default)]
    pub min_confidence: Option<f64>,
    /// Cadence for repeated execution; absent means single-shot.
    #[serde(default)]
    pub execution_interval: Option<Interval>,
}

fn default_testnet() -> bool {
    true
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            testnet: true,
            max_order_size: None,
            min_confidence: None,
            execution_interval: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub mode: Mode,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub primary_interval: Interval,
    pub initial_cash: f64,
    pub margin_requirement: f64,
    #[serde(default)]
    pub show_reasoning: bool,
    pub signals: SignalsConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config.yaml")
    }

    /// Load from a YAML file, overlaid with `AGENT_*` environment variables
    /// (`AGENT_EXECUTION__TESTNET=false`, etc.).
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            .add_source(File::from(path.as_ref().to_path_buf()))
            .add_source(
                Environment::with_prefix("AGENT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app: AppConfig = cfg.try_deserialize()?;
        app.validate().map_err(ConfigError::Invalid)?;
        Ok(app)
    }

    /// Collect every problem instead of stopping at the first one.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.signals.tickers.is_empty() {
            errors.push("signals.tickers must not be empty".to_string());
        }
        if self.signals.intervals.is_empty() {
            errors.push("signals.intervals must not be empty".to_string());
        }
        if self.signals.strategies.is_empty() {
            errors.push("signals.strategies must not be empty".to_string());
        }

        if !self.signals.intervals.contains(&self.primary_interval) {
            errors.push(format!(
                "primary_interval '{}' must be in signals.intervals",
                self.primary_interval
            ));
        }

        if self.initial_cash <= 0.0 {
            errors.push("initial_cash must be positive".to_string());
        }
        if self.margin_requirement <= 0.0 {
            errors.push("margin_requirement must be positive".to_string());
        }

        if self.execution.enabled {
            match self.execution.max_order_size {
                None => errors.push(
                    "execution.max_order_size is required when execution.enabled".to_string(),
                ),
                Some(max) if max <= 0.0 => {
                    errors.push("execution.max_order_size must be positive".to_string());
                }
                Some(_) => {}
            }
            match self.execution.min_confidence {
                None => errors.push(
                    "execution.min_confidence is required when execution.enabled".to_string(),
                ),
                Some(min) if !(0.0..=100.0).contains(&min) => {
                    errors.push("execution.min_confidence must be within 0-100".to_string());
                }
                Some(_) => {}
            }
        }

        if self.mode == Mode::Backtest && self.start_date >= self.end_date {
            errors.push("start_date must precede end_date in backtest mode".to_string());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            mode: Mode::Live,
            start_date: "2025-01-01T00:00:00Z".parse().unwrap(),
            end_date: "2025-06-01T00:00:00Z".parse().unwrap(),
            primary_interval: Interval::Hour1,
            initial_cash: 100_000.0,
            margin_requirement: 0.5,
            show_reasoning: false,
            signals: SignalsConfig {
                intervals: vec![Interval::Min5, Interval::Hour1],
                tickers: vec!["BTCUSDT".to_string()],
                strategies: vec!["macd".to_string(), "rsi".to_string()],
            },
            model: ModelConfig {
                name: "gpt-4o".to_string(),
                provider: "openai".to_string(),
                base_url: None,
            },
            execution: ExecutionConfig {
                enabled: true,
                testnet: true,
                max_order_size: Some(1_000.0),
                min_confidence: Some(70.0),
                execution_interval: Some(Interval::Min5),
            },
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn empty_tickers_rejected() {
        let mut cfg = valid_config();
        cfg.signals.tickers.clear();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("signals.tickers")));
    }

    #[test]
    fn empty_intervals_and_strategies_rejected() {
        let mut cfg = valid_config();
        cfg.signals.intervals.clear();
        cfg.signals.strategies.clear();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("signals.intervals")));
        assert!(errors.iter().any(|e| e.contains("signals.strategies")));
    }

    #[test]
    fn enabled_execution_requires_guards() {
        let mut cfg = valid_config();
        cfg.execution.max_order_size = None;
        cfg.execution.min_confidence = None;
        let errors = cfg.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("max_order_size")));
        assert!(errors.iter().any(|e| e.contains("min_confidence")));
    }

    #[test]
    fn disabled_execution_needs_no_guards() {
        let mut cfg = valid_config();
        cfg.execution.enabled = false;
        cfg.execution.max_order_size = None;
        cfg.execution.min_confidence = None;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn primary_interval_must_be_configured() {
        let mut cfg = valid_config();
        cfg.primary_interval = Interval::Day1;
        let errors = cfg.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("primary_interval")));
    }

    #[test]
    fn min_confidence_range_checked() {
        let mut cfg = valid_config();
        cfg.execution.min_confidence = Some(120.0);
        let errors = cfg.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("0-100")));
    }
}
