use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

use common::models::{OrderRequest, OrderResult};
use market_data::MarketDataError;
use market_data::remote::BinanceClient;

#[derive(Debug, Clone, Error)]
pub enum ExchangeError {
    /// Worth retrying: the exchange may accept the same request shortly.
    #[error("transient exchange failure: {0}")]
    Transient(String),

    /// Final for this request: the exchange saw it and said no.
    #[error("exchange rejected order: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExchangeFill {
    pub exchange_order_id: u64,
    pub executed_qty: f64,
    pub executed_notional: f64,
}

/// The exchange capability. Testnet and mainnet bind the same trait; only
/// the endpoint behind it differs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    async fn submit_market_order(
        &self,
        request: &OrderRequest,
    ) -> Result<ExchangeFill, ExchangeError>;
}

/// Production binding over the signed REST client.
pub struct BinanceExchange {
    client: BinanceClient,
}

impl BinanceExchange {
    pub fn new(client: BinanceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExchangeClient for BinanceExchange {
    async fn submit_market_order(
        &self,
        request: &OrderRequest,
    ) -> Result<ExchangeFill, ExchangeError> {
        let response = self
            .client
            .post_market_order(
                &request.ticker,
                request.side.as_str(),
                request.notional_usd,
                &request.client_order_id,
            )
            .await
            .map_err(|e: MarketDataError| {
                if e.is_transient() {
                    ExchangeError::Transient(e.to_string())
                } else {
                    ExchangeError::Rejected(e.to_string())
                }
            })?;

        match response.status.as_str() {
            "REJECTED" | "EXPIRED" | "CANCELED" => {
                Err(ExchangeError::Rejected(format!("status {}", response.status)))
            }
            _ => Ok(ExchangeFill {
                exchange_order_id: response.order_id,
                executed_qty: response.executed_qty.parse().unwrap_or(0.0),
                executed_notional: response.cummulative_quote_qty.parse().unwrap_or(0.0),
            }),
        }
    }
}

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Submits orders with bounded retry on transient failures.
///
/// Exchange-side rejections are final immediately; transport hiccups back
/// off exponentially until the attempts are exhausted, after which the
/// result is `Failed` and the caller must not advance execution state.
pub struct OrderSubmitter {
    exchange: Arc<dyn ExchangeClient>,
    max_retries: u32,
    base_backoff: Duration,
}

impl OrderSubmitter {
    pub fn new(exchange: Arc<dyn ExchangeClient>) -> Self {
        Self::with_policy(exchange, DEFAULT_MAX_RETRIES, DEFAULT_BASE_BACKOFF)
    }

    pub fn with_policy(
        exchange: Arc<dyn ExchangeClient>,
        max_retries: u32,
        base_backoff: Duration,
    ) -> Self {
        Self {
            exchange,
            max_retries,
            base_backoff,
        }
    }

    pub async fn submit(&self, request: &OrderRequest) -> OrderResult {
        let mut attempt = 0u32;
        loop {
            match self.exchange.submit_market_order(request).await {
                Ok(fill) => {
                    info!(
                        "{}: order {} accepted (exchange id {})",
                        request.ticker, request.client_order_id, fill.exchange_order_id
                    );
                    return OrderResult::accepted(
                        request.client_order_id.clone(),
                        fill.exchange_order_id,
                        fill.executed_qty,
                        fill.executed_notional,
                    );
                }
                Err(ExchangeError::Rejected(reason)) => {
                    error!(
                        "{}: order {} rejected: {}",
                        request.ticker, request.client_order_id, reason
                    );
                    return OrderResult::rejected(request.client_order_id.clone(), reason);
                }
                Err(ExchangeError::Transient(reason)) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!(
                            "{}: order {} failed after {} attempts: {}",
                            request.ticker, request.client_order_id, attempt, reason
                        );
                        return OrderResult::failed(request.client_order_id.clone(), reason);
                    }
                    let backoff = self.base_backoff * 2u32.pow(attempt - 1);
                    warn!(
                        "{}: transient failure ({}), retrying in {:?} (attempt {}/{})",
                        request.ticker, reason, backoff, attempt, self.max_retries
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::{OrderSide, OrderStatus};
    use mockall::Sequence;

    fn request() -> OrderRequest {
        OrderRequest {
            ticker: "BTCUSDT".to_string(),
            side: OrderSide::Buy,
            notional_usd: 100.0,
            max_notional_usd: 100.0,
            confidence: 80.0,
            client_order_id: "BTCUSDT-1700000000".to_string(),
        }
    }

    fn fill() -> ExchangeFill {
        ExchangeFill {
            exchange_order_id: 42,
            executed_qty: 0.001,
            executed_notional: 100.0,
        }
    }

    #[tokio::test]
    async fn transient_failure_is_retried_to_success() {
        let mut exchange = MockExchangeClient::new();
        let mut seq = Sequence::new();
        exchange
            .expect_submit_market_order()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(ExchangeError::Transient("timeout".to_string())));
        exchange
            .expect_submit_market_order()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(fill()));

        let submitter =
            OrderSubmitter::with_policy(Arc::new(exchange), 3, Duration::from_millis(1));
        let result = submitter.submit(&request()).await;

        assert_eq!(result.status, OrderStatus::Accepted);
        assert_eq!(result.exchange_order_id, Some(42));
    }

    #[tokio::test]
    async fn rejection_is_final_without_retry() {
        let mut exchange = MockExchangeClient::new();
        exchange
            .expect_submit_market_order()
            .times(1)
            .returning(|_| Err(ExchangeError::Rejected("insufficient balance".to_string())));

        let submitter =
            OrderSubmitter::with_policy(Arc::new(exchange), 3, Duration::from_millis(1));
        let result = submitter.submit(&request()).await;

        assert_eq!(result.status, OrderStatus::Rejected);
        assert!(result.error.unwrap().contains("insufficient balance"));
    }

    #[tokio::test]
    async fn exhausted_retries_fail_the_order() {
        let mut exchange = MockExchangeClient::new();
        exchange
            .expect_submit_market_order()
            .times(3)
            .returning(|_| Err(ExchangeError::Transient("connect".to_string())));

        let submitter =
            OrderSubmitter::with_policy(Arc::new(exchange), 2, Duration::from_millis(1));
        let result = submitter.submit(&request()).await;

        assert_eq!(result.status, OrderStatus::Failed);
    }
}
