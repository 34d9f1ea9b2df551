pub mod aggregator;
pub mod error;
pub mod runner;
pub mod strategies;

pub use aggregator::SignalAggregator;
pub use error::StrategyError;
pub use runner::{StrategyRunner, TickerSignals};
pub use strategies::{MacdStrategy, RsiStrategy, Strategy};
