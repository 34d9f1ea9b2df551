use chrono::DateTime;
use serde::Deserialize;

use common::models::{Bar, Interval};

use crate::error::MarketDataError;

/// One row of the klines endpoint: a heterogeneous JSON array of
/// [open_time, open, high, low, close, volume, close_time, quote_volume,
/// trades, taker_base, taker_quote, unused].
#[derive(Debug, Deserialize)]
pub struct KlineRow(
    pub i64,
    pub String,
    pub String,
    pub String,
    pub String,
    pub String,
    pub i64,
    pub String,
    pub i64,
    pub String,
    pub String,
    pub String,
);

impl KlineRow {
    pub fn into_bar(self, ticker: &str, interval: Interval) -> Result<Bar, MarketDataError> {
        let open_time = DateTime::from_timestamp_millis(self.0).unwrap_or_default();
        Ok(Bar {
            ticker: ticker.to_string(),
            interval,
            open_time,
            open: self.1.parse()?,
            high: self.2.parse()?,
            low: self.3.parse()?,
            close: self.4.parse()?,
            volume: self.5.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exchange_row() {
        let json = r#"[1499040000000,"0.01634790","0.80000000","0.01575800","0.01577100","148976.1",1499644799999,"2434.19",308,"1756.87","28.46","0"]"#;
        let row: KlineRow = serde_json::from_str(json).unwrap();
        let bar = row.into_bar("BTCUSDT", Interval::Hour1).unwrap();

        assert_eq!(bar.ticker, "BTCUSDT");
        assert_eq!(bar.open_time.timestamp_millis(), 1_499_040_000_000);
        assert!((bar.open - 0.0163479).abs() < 1e-9);
        assert!((bar.volume - 148_976.1).abs() < 1e-6);
    }

    #[test]
    fn garbage_numeric_field_is_an_error() {
        let json = r#"[0,"not-a-number","0","0","0","0",0,"0",0,"0","0","0"]"#;
        let row: KlineRow = serde_json::from_str(json).unwrap();
        assert!(row.into_bar("BTCUSDT", Interval::Min5).is_err());
    }
}
