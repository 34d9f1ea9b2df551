use ta::Next;
use ta::indicators::MovingAverageConvergenceDivergence;

use common::models::{Bar, Direction, StrategySignal};

use crate::error::StrategyError;

use super::Strategy;

/// Histogram magnitude, as a fraction of price, that maps to full strength.
const FULL_STRENGTH_HIST_PCT: f64 = 0.0025;

/// Trend-following vote from the MACD histogram sign.
#[derive(Debug, Clone, Copy)]
pub struct MacdStrategy {
    fast: usize,
    slow: usize,
    signal: usize,
}

impl Default for MacdStrategy {
    fn default() -> Self {
        // Standard MACD(12, 26, 9)
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

impl Strategy for MacdStrategy {
    fn name(&self) -> &'static str {
        "macd"
    }

    fn min_bars(&self) -> usize {
        self.slow + self.signal
    }

    fn compute(&self, bars: &[Bar]) -> Result<StrategySignal, StrategyError> {
        if bars.len() < self.min_bars() {
            return Err(StrategyError::InsufficientData {
                have: bars.len(),
                need: self.min_bars(),
            });
        }

        let mut macd = MovingAverageConvergenceDivergence::new(self.fast, self.slow, self.signal)
            .map_err(|e| StrategyError::InvalidParams(e.to_string()))?;

        let mut histogram = 0.0;
        for bar in bars {
            histogram = macd.next(bar.close).histogram;
        }

        let last = &bars[bars.len() - 1];
        let direction = if histogram > 0.0 {
            Direction::Long
        } else if histogram < 0.0 {
            Direction::Short
        } else {
            Direction::Flat
        };
        let strength = if last.close > 0.0 {
            (histogram.abs() / last.close / FULL_STRENGTH_HIST_PCT).min(1.0)
        } else {
            0.0
        };

        Ok(StrategySignal {
            ticker: last.ticker.clone(),
            interval: last.interval,
            strategy: self.name().to_string(),
            direction,
            strength,
            at: last.open_time,
        })
    }
}
