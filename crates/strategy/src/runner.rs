use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tracing::warn;

use common::error::CellFailure;
use common::models::{Interval, StrategySignal};
use market_data::MarketDataGate;

use crate::error::StrategyError;
use crate::strategies::{Strategy, build_strategies};

/// Everything one ticker produced in one tick: surviving signals plus the
/// cells that failed. Failed cells are absent from the vote, not neutral
/// votes.
#[derive(Debug)]
pub struct TickerSignals {
    pub ticker: String,
    pub signals: Vec<StrategySignal>,
    pub failures: Vec<CellFailure>,
}

/// Drives every configured strategy over every configured interval for a
/// ticker. One failing cell never takes down the others.
pub struct StrategyRunner {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl StrategyRunner {
    pub fn from_names(names: &[String]) -> Result<Self, StrategyError> {
        Ok(Self {
            strategies: build_strategies(names)?,
        })
    }

    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }

    pub async fn run_ticker(
        &self,
        gate: &MarketDataGate,
        ticker: &str,
        intervals: &[Interval],
        as_of: DateTime<Utc>,
    ) -> TickerSignals {
        let fetches = intervals.iter().map(|&interval| async move {
            (interval, gate.get_bars(ticker, interval, as_of).await)
        });

        let mut signals = Vec::with_capacity(intervals.len() * self.strategies.len());
        let mut failures = Vec::new();

        for (interval, fetched) in join_all(fetches).await {
            let bars = match fetched {
                Ok(bars) => bars,
                Err(e) => {
                    warn!("{}/{}: data unavailable: {}", ticker, interval, e);
                    failures.push(CellFailure::DataUnavailable {
                        ticker: ticker.to_string(),
                        interval,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            for strategy in &self.strategies {
                match strategy.compute(&bars) {
                    Ok(signal) => signals.push(signal),
                    Err(e) => {
                        warn!("{}/{} {}: {}", ticker, interval, strategy.name(), e);
                        failures.push(CellFailure::StrategyFailed {
                            ticker: ticker.to_string(),
                            interval,
                            strategy: strategy.name().to_string(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        TickerSignals {
            ticker: ticker.to_string(),
            signals,
            failures,
        }
    }
}
