use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use common::models::{Bar, Interval};

use crate::error::MarketDataError;
use crate::gate::BarSource;
use crate::remote::kline_response::KlineRow;

const MAX_CONCURRENT_REQUESTS: usize = 5;

/// Public (unsigned) REST poller for candle history.
///
/// Shared across the whole tick fan-out; the semaphore bounds concurrent
/// upstream requests so a wide ticker matrix cannot trip the exchange
/// rate limits. No retries here: transient failures propagate to the
/// strategy runner, which tolerates missing cells.
pub struct BinancePoller {
    client: Client,
    base_url: String,
    semaphore: Arc<Semaphore>,
}

impl BinancePoller {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::builder()
                .user_agent("signal-agent/0.1.0")
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client."),
            base_url,
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_REQUESTS)),
        }
    }

    pub fn from_env() -> Self {
        let base_url = std::env::var("BINANCE_DATA_URL")
            .unwrap_or_else(|_| "https://api.binance.com".to_string());
        Self::new(base_url)
    }

    async fn fetch_klines(
        &self,
        ticker: &str,
        interval: Interval,
        as_of: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Bar>, MarketDataError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("semaphore closed while poller alive");

        let url = format!("{}/api/v3/klines", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", ticker.to_uppercase()),
                ("interval", interval.as_str().to_string()),
                ("endTime", as_of.timestamp_millis().to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarketDataError::Api {
                status: status.as_u16(),
                body,
            });
        }

        if let Some(used_weight) = response.headers().get("x-mbx-used-weight-1m") {
            match used_weight.to_str().ok().and_then(|w| w.parse::<u32>().ok()) {
                Some(w) if w > 1000 => warn!("High API weight usage: {}", w),
                Some(w) => debug!("Used weights: {}/1200", w),
                None => {}
            }
        }

        let rows: Vec<KlineRow> = response.json().await?;
        rows.into_iter()
            .map(|row| row.into_bar(ticker, interval))
            .collect()
    }
}

#[async_trait]
impl BarSource for BinancePoller {
    async fn fetch_bars(
        &self,
        ticker: &str,
        interval: Interval,
        as_of: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Bar>, MarketDataError> {
        self.fetch_klines(ticker, interval, as_of, limit).await
    }
}
