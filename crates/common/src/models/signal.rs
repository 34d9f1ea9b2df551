use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
    Flat,
}

impl Direction {
    /// Signed contribution of this direction to a weighted vote.
    pub fn vote_sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
            Direction::Flat => 0.0,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
            Direction::Flat => write!(f, "flat"),
        }
    }
}

/// A single strategy's vote for one (ticker, interval) cell.
///
/// `strength` is in [0,1]; direction carries the sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySignal {
    pub ticker: String,
    pub interval: Interval,
    pub strategy: String,
    pub direction: Direction,
    pub strength: f64,
    pub at: DateTime<Utc>,
}
