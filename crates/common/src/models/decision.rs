use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Direction, StrategySignal};

/// The reduced per-ticker decision for one tick.
///
/// `confidence` is on the same 0-100 scale as `execution.min_confidence`
/// so the risk gate compares them directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedDecision {
    pub ticker: String,
    pub direction: Direction,
    pub confidence: f64,
    pub signals: Vec<StrategySignal>,
    pub at: DateTime<Utc>,
}

/// LLM commentary attached to a decision.
///
/// May move confidence; never flips direction. A differing
/// `suggested_direction` is kept here and logged, nothing more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rationale {
    pub ticker: String,
    pub narrative: String,
    pub confidence_delta: f64,
    pub suggested_direction: Option<Direction>,
}
