use std::env;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{error, info};

use crate::error::MarketDataError;

type HmacSha256 = Hmac<Sha256>;

pub const MAINNET_BASE_URL: &str = "https://api.binance.com";
pub const TESTNET_BASE_URL: &str = "https://testnet.binance.vision";

#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    #[serde(rename = "orderId")]
    pub order_id: u64,
    pub symbol: String,
    pub status: String,
    #[serde(rename = "executedQty")]
    pub executed_qty: String,
    #[serde(rename = "cummulativeQuoteQty")]
    pub cummulative_quote_qty: String,
}

#[derive(Debug, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub free: String,
    pub locked: String,
}

#[derive(Debug, Deserialize)]
pub struct AccountInformation {
    pub balances: Vec<Balance>,
    #[serde(rename = "canTrade")]
    pub can_trade: bool,
}

/// Signed REST client for account state and order placement.
///
/// The testnet binding differs from mainnet only in the base URL; the
/// request flow is identical.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    api_key: String,
    secret_key: String,
}

impl BinanceClient {
    pub fn new(base_url: String, api_key: String, secret_key: String) -> Self {
        Self {
            client: Client::builder()
                .user_agent("signal-agent/0.1.0")
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client."),
            base_url,
            api_key,
            secret_key,
        }
    }

    pub fn from_env(testnet: bool) -> Result<Self, MarketDataError> {
        let api_key = env::var("BINANCE_API_KEY")
            .map_err(|_| MarketDataError::Credentials("BINANCE_API_KEY not set".to_string()))?;
        let secret_key = env::var("BINANCE_SECRET_KEY")
            .map_err(|_| MarketDataError::Credentials("BINANCE_SECRET_KEY not set".to_string()))?;
        let base_url = env::var("BINANCE_BASE_URL").unwrap_or_else(|_| {
            if testnet { TESTNET_BASE_URL } else { MAINNET_BASE_URL }.to_string()
        });

        Ok(Self::new(base_url, api_key, secret_key))
    }

    fn sign(&self, query: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis() as u64
    }

    pub async fn get_account(&self) -> Result<AccountInformation, MarketDataError> {
        let params = format!("timestamp={}", Self::timestamp_ms());
        let signature = self.sign(&params);
        let url = format!(
            "{}/api/v3/account?{}&signature={}",
            self.base_url, params, signature
        );

        let resp = self
            .client
            .get(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("Binance account info failed: {}", body);
            return Err(MarketDataError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json::<AccountInformation>().await?)
    }

    /// Place a MARKET order sized by quote notional (USD). The caller's
    /// `client_order_id` rides as `newClientOrderId`, so the exchange
    /// deduplicates a resubmitted logical decision.
    pub async fn post_market_order(
        &self,
        symbol: &str,
        side: &str,
        quote_notional: f64,
        client_order_id: &str,
    ) -> Result<OrderResponse, MarketDataError> {
        let params = format!(
            "symbol={}&side={}&type=MARKET&quoteOrderQty={:.2}&newClientOrderId={}&timestamp={}",
            symbol.to_uppercase(),
            side,
            quote_notional,
            client_order_id,
            Self::timestamp_ms(),
        );
        let signature = self.sign(&params);
        let url = format!("{}/api/v3/order?{}&signature={}", self.base_url, params, signature);

        info!(
            "Placing order: {} {:.2} USD of {} (id {})",
            side, quote_notional, symbol, client_order_id
        );

        let resp = self
            .client
            .request(Method::POST, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("Binance order failed: {}", body);
            return Err(MarketDataError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json::<OrderResponse>().await?)
    }
}
