use ta::Next;
use ta::indicators::RelativeStrengthIndex;

use common::models::{Bar, Direction, StrategySignal};

use crate::error::StrategyError;

use super::Strategy;

/// Mean-reversion vote from RSI band crossings: overbought argues short,
/// oversold argues long, the middle band abstains.
#[derive(Debug, Clone, Copy)]
pub struct RsiStrategy {
    period: usize,
    upper: f64,
    lower: f64,
}

impl Default for RsiStrategy {
    fn default() -> Self {
        // Standard RSI(14) with 70/30 bands
        Self {
            period: 14,
            upper: 70.0,
            lower: 30.0,
        }
    }
}

impl Strategy for RsiStrategy {
    fn name(&self) -> &'static str {
        "rsi"
    }

    fn min_bars(&self) -> usize {
        self.period + 1
    }

    fn compute(&self, bars: &[Bar]) -> Result<StrategySignal, StrategyError> {
        if bars.len() < self.min_bars() {
            return Err(StrategyError::InsufficientData {
                have: bars.len(),
                need: self.min_bars(),
            });
        }

        let mut rsi = RelativeStrengthIndex::new(self.period)
            .map_err(|e| StrategyError::InvalidParams(e.to_string()))?;

        let mut value = 50.0;
        for bar in bars {
            value = rsi.next(bar.close);
        }

        let (direction, strength) = if value > self.upper {
            (
                Direction::Short,
                ((value - self.upper) / (100.0 - self.upper)).min(1.0),
            )
        } else if value < self.lower {
            (Direction::Long, ((self.lower - value) / self.lower).min(1.0))
        } else {
            (Direction::Flat, 0.0)
        };

        let last = &bars[bars.len() - 1];
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

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::Interval;

    fn series(closes: impl Iterator<Item = f64>) -> Vec<Bar> {
        closes
            .enumerate()
            .map(|(i, close)| Bar {
                ticker: "ETHUSDT".to_string(),
                interval: Interval::Min15,
                open_time: chrono::DateTime::from_timestamp(1_700_000_000 + i as i64 * 900, 0)
                    .unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
            })
            .collect()
    }

    #[test]
    fn relentless_rally_is_overbought_short() {
        let bars = series((0..30).map(|i| 100.0 + i as f64 * 2.0));
        let signal = RsiStrategy::default().compute(&bars).unwrap();
        assert_eq!(signal.direction, Direction::Short);
        assert!(signal.strength > 0.5);
    }

    #[test]
    fn relentless_selloff_is_oversold_long() {
        let bars = series((0..30).map(|i| 200.0 - i as f64 * 2.0));
        let signal = RsiStrategy::default().compute(&bars).unwrap();
        assert_eq!(signal.direction, Direction::Long);
        assert!(signal.strength > 0.5);
    }

    #[test]
    fn middle_band_abstains() {
        // Alternating up/down keeps RSI near 50.
        let bars = series((0..30).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }));
        let signal = RsiStrategy::default().compute(&bars).unwrap();
        assert_eq!(signal.direction, Direction::Flat);
        assert_eq!(signal.strength, 0.0);
    }

    #[test]
    fn short_series_is_insufficient() {
        let bars = series((0..5).map(|i| 100.0 + i as f64));
        assert!(matches!(
            RsiStrategy::default().compute(&bars).unwrap_err(),
            StrategyError::InsufficientData { .. }
        ));
    }
}
