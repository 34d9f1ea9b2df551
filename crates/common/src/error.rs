use thiserror::Error;

use crate::models::Interval;

/// Per-cell failure inside one tick. Tolerated: the cell drops out of the
/// aggregation input and the failure is carried in the tick report.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CellFailure {
    #[error("no data for {ticker}/{interval}: {reason}")]
    DataUnavailable {
        ticker: String,
        interval: Interval,
        reason: String,
    },

    #[error("strategy {strategy} failed for {ticker}/{interval}: {reason}")]
    StrategyFailed {
        ticker: String,
        interval: Interval,
        strategy: String,
        reason: String,
    },
}

impl CellFailure {
    pub fn ticker(&self) -> &str {
        match self {
            CellFailure::DataUnavailable { ticker, .. } => ticker,
            CellFailure::StrategyFailed { ticker, .. } => ticker,
        }
    }
}

/// Fatal at startup only. Everything downstream of a loaded configuration
/// degrades per ticker or per cell instead of aborting the process.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}
