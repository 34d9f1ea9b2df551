use chrono::{DateTime, Utc};

use super::Interval;

/// One closed candle for a (ticker, interval) stream.
///
/// Immutable once produced; streams are ordered by `open_time`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub ticker: String,
    pub interval: Interval,
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}
