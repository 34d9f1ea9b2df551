use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Candle interval, matching the exchange's interval vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    Min1,
    #[serde(rename = "3m")]
    Min3,
    #[serde(rename = "5m")]
    Min5,
    #[serde(rename = "15m")]
    Min15,
    #[serde(rename = "30m")]
    Min30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "2h")]
    Hour2,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "6h")]
    Hour6,
    #[serde(rename = "12h")]
    Hour12,
    #[serde(rename = "1d")]
    Day1,
}

impl Interval {
    /// Wire string as the exchange expects it, e.g. "5m".
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Min1 => "1m",
            Interval::Min3 => "3m",
            Interval::Min5 => "5m",
            Interval::Min15 => "15m",
            Interval::Min30 => "30m",
            Interval::Hour1 => "1h",
            Interval::Hour2 => "2h",
            Interval::Hour4 => "4h",
            Interval::Hour6 => "6h",
            Interval::Hour12 => "12h",
            Interval::Day1 => "1d",
        }
    }

    pub fn duration(&self) -> Duration {
        let secs = match self {
            Interval::Min1 => 60,
            Interval::Min3 => 3 * 60,
            Interval::Min5 => 5 * 60,
            Interval::Min15 => 15 * 60,
            Interval::Min30 => 30 * 60,
            Interval::Hour1 => 3_600,
            Interval::Hour2 => 2 * 3_600,
            Interval::Hour4 => 4 * 3_600,
            Interval::Hour6 => 6 * 3_600,
            Interval::Hour12 => 12 * 3_600,
            Interval::Day1 => 86_400,
        };
        Duration::from_secs(secs)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
