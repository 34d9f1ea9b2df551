mod macd;
mod rsi;

use std::sync::Arc;

pub use macd::MacdStrategy;
pub use rsi::RsiStrategy;

use common::models::{Bar, StrategySignal};

use crate::error::StrategyError;

/// A pluggable signal capability. Implementations are resolved from
/// configured names once at startup; past that point the pipeline treats
/// every variant identically.
pub trait Strategy: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Smallest series the indicator can warm up on.
    fn min_bars(&self) -> usize;

    /// Produce a vote for the (ticker, interval) the bars belong to.
    fn compute(&self, bars: &[Bar]) -> Result<StrategySignal, StrategyError>;
}

/// Resolve configured strategy names into capability instances.
pub fn build_strategies(names: &[String]) -> Result<Vec<Arc<dyn Strategy>>, StrategyError> {
    names
        .iter()
        .map(|name| match name.to_lowercase().as_str() {
            "macd" => Ok(Arc::new(MacdStrategy::default()) as Arc<dyn Strategy>),
            "rsi" => Ok(Arc::new(RsiStrategy::default()) as Arc<dyn Strategy>),
            other => Err(StrategyError::Unknown(other.to_string())),
        })
        .collect()
}
