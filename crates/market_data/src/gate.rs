use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use common::models::{Bar, Interval};

use crate::error::MarketDataError;

/// Upstream candle history capability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BarSource: Send + Sync {
    /// Ordered bars for (ticker, interval) ending at `as_of`, newest last.
    async fn fetch_bars(
        &self,
        ticker: &str,
        interval: Interval,
        as_of: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Bar>, MarketDataError>;
}

/// Normalizing cache in front of the upstream source.
///
/// Within one tick every (ticker, interval) series is fetched at most once;
/// `begin_tick` expires the cache so the next tick sees fresh data. No
/// retries here: a failed fetch surfaces to the strategy runner as a
/// missing cell.
pub struct MarketDataGate {
    source: Arc<dyn BarSource>,
    history: usize,
    cache: Mutex<HashMap<(String, Interval), Arc<Vec<Bar>>>>,
}

impl MarketDataGate {
    pub fn new(source: Arc<dyn BarSource>, history: usize) -> Self {
        Self {
            source,
            history,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Expire all cached series. Called once at the start of every tick.
    pub async fn begin_tick(&self) {
        self.cache.lock().await.clear();
    }

    pub async fn get_bars(
        &self,
        ticker: &str,
        interval: Interval,
        as_of: DateTime<Utc>,
    ) -> Result<Arc<Vec<Bar>>, MarketDataError> {
        let key = (ticker.to_string(), interval);

        if let Some(bars) = self.cache.lock().await.get(&key) {
            debug!("Cache hit for {}/{}", ticker, interval);
            return Ok(bars.clone());
        }

        let bars = self
            .source
            .fetch_bars(ticker, interval, as_of, self.history)
            .await?;

        if bars.is_empty() {
            return Err(MarketDataError::DataUnavailable {
                ticker: ticker.to_string(),
                interval,
                as_of,
            });
        }

        let bars = Arc::new(bars);
        self.cache.lock().await.insert(key, bars.clone());
        Ok(bars)
    }
}
