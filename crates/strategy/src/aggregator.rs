use chrono::{DateTime, Utc};

use common::models::{AggregatedDecision, Direction, StrategySignal};

/// Reduces a ticker's signal set into one decision.
///
/// Each signal votes `sign(direction) * strength`; the net vote's sign picks
/// the direction (an exact tie is flat) and its magnitude, normalized by the
/// configured matrix size, becomes the 0-100 confidence. Normalizing by the
/// configured size rather than the surviving signal count means missing
/// cells pull confidence down instead of being invisible.
#[derive(Debug, Clone, Copy)]
pub struct SignalAggregator {
    expected_cells: usize,
}

impl SignalAggregator {
    pub fn new(interval_count: usize, strategy_count: usize) -> Self {
        Self {
            expected_cells: (interval_count * strategy_count).max(1),
        }
    }

    pub fn aggregate(
        &self,
        ticker: &str,
        signals: &[StrategySignal],
        at: DateTime<Utc>,
    ) -> AggregatedDecision {
        let net: f64 = signals
            .iter()
            .map(|s| s.direction.vote_sign() * s.strength.clamp(0.0, 1.0))
            .sum();

        let direction = if net > 0.0 {
            Direction::Long
        } else if net < 0.0 {
            Direction::Short
        } else {
            Direction::Flat
        };

        let confidence = (net.abs() / self.expected_cells as f64 * 100.0).min(100.0);

        AggregatedDecision {
            ticker: ticker.to_string(),
            direction,
            confidence,
            signals: signals.to_vec(),
            at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::Interval;

    fn signal(strategy: &str, interval: Interval, direction: Direction, strength: f64) -> StrategySignal {
        StrategySignal {
            ticker: "BTCUSDT".to_string(),
            interval,
            strategy: strategy.to_string(),
            direction,
            strength,
            at: at(),
        }
    }

    fn at() -> DateTime<Utc> {
        "2025-03-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn permuting_signals_changes_nothing() {
        let aggregator = SignalAggregator::new(2, 2);
        let mut signals = vec![
            signal("macd", Interval::Min5, Direction::Long, 0.8),
            signal("rsi", Interval::Min5, Direction::Short, 0.3),
            signal("macd", Interval::Hour1, Direction::Long, 0.5),
            signal("rsi", Interval::Hour1, Direction::Flat, 0.0),
        ];

        let forward = aggregator.aggregate("BTCUSDT", &signals, at());
        signals.reverse();
        let backward = aggregator.aggregate("BTCUSDT", &signals, at());

        assert_eq!(forward.direction, backward.direction);
        assert_eq!(forward.confidence, backward.confidence);
    }

    #[test]
    fn net_vote_sign_picks_direction() {
        let aggregator = SignalAggregator::new(1, 2);
        let long_heavy = aggregator.aggregate(
            "BTCUSDT",
            &[
                signal("macd", Interval::Min5, Direction::Long, 0.9),
                signal("rsi", Interval::Min5, Direction::Short, 0.2),
            ],
            at(),
        );
        assert_eq!(long_heavy.direction, Direction::Long);

        let short_heavy = aggregator.aggregate(
            "BTCUSDT",
            &[
                signal("macd", Interval::Min5, Direction::Long, 0.2),
                signal("rsi", Interval::Min5, Direction::Short, 0.9),
            ],
            at(),
        );
        assert_eq!(short_heavy.direction, Direction::Short);
    }

    #[test]
    fn exact_tie_is_flat() {
        let aggregator = SignalAggregator::new(1, 2);
        let decision = aggregator.aggregate(
            "BTCUSDT",
            &[
                signal("macd", Interval::Min5, Direction::Long, 0.5),
                signal("rsi", Interval::Min5, Direction::Short, 0.5),
            ],
            at(),
        );
        assert_eq!(decision.direction, Direction::Flat);
        assert_eq!(decision.confidence, 0.0);
    }

    #[test]
    fn no_signals_is_flat_zero() {
        let aggregator = SignalAggregator::new(2, 2);
        let decision = aggregator.aggregate("BTCUSDT", &[], at());
        assert_eq!(decision.direction, Direction::Flat);
        assert_eq!(decision.confidence, 0.0);
        assert!(decision.signals.is_empty());
    }

    #[test]
    fn missing_cells_degrade_confidence_proportionally() {
        let aggregator = SignalAggregator::new(2, 2);
        let full: Vec<_> = (0..4)
            .map(|i| {
                let interval = if i % 2 == 0 { Interval::Min5 } else { Interval::Hour1 };
                signal("macd", interval, Direction::Long, 1.0)
            })
            .collect();

        let all_cells = aggregator.aggregate("BTCUSDT", &full, at());
        assert_eq!(all_cells.confidence, 100.0);

        let degraded = aggregator.aggregate("BTCUSDT", &full[..3], at());
        assert_eq!(degraded.direction, Direction::Long);
        assert_eq!(degraded.confidence, 75.0);
    }

    #[test]
    fn dropping_an_agreeing_signal_never_raises_confidence() {
        let aggregator = SignalAggregator::new(2, 2);
        let signals = vec![
            signal("macd", Interval::Min5, Direction::Long, 0.9),
            signal("rsi", Interval::Min5, Direction::Long, 0.4),
            signal("macd", Interval::Hour1, Direction::Long, 0.6),
        ];
        let full = aggregator.aggregate("BTCUSDT", &signals, at());

        for skip in 0..signals.len() {
            let subset: Vec<_> = signals
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skip)
                .map(|(_, s)| s.clone())
                .collect();
            let partial = aggregator.aggregate("BTCUSDT", &subset, at());
            assert!(partial.confidence <= full.confidence);
        }
    }

    #[test]
    fn confidence_is_capped_at_one_hundred() {
        // A mis-sized aggregator cannot push confidence past the scale.
        let aggregator = SignalAggregator::new(1, 1);
        let decision = aggregator.aggregate(
            "BTCUSDT",
            &[
                signal("macd", Interval::Min5, Direction::Long, 1.0),
                signal("rsi", Interval::Min5, Direction::Long, 1.0),
            ],
            at(),
        );
        assert_eq!(decision.confidence, 100.0);
    }
}
