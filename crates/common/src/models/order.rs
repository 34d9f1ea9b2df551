use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Side string as the exchange expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

/// A candidate market order that passed the risk gate.
///
/// `client_order_id` is the idempotency key derived from
/// (ticker, tick timestamp); it rides to the exchange unchanged so a
/// repeated tick can never submit the same logical decision twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub ticker: String,
    pub side: OrderSide,
    pub notional_usd: f64,
    pub max_notional_usd: f64,
    pub confidence: f64,
    pub client_order_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Accepted,
    Rejected,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub client_order_id: String,
    pub status: OrderStatus,
    pub exchange_order_id: Option<u64>,
    pub executed_qty: Option<f64>,
    pub executed_notional: Option<f64>,
    pub error: Option<String>,
}

impl OrderResult {
    pub fn accepted(
        client_order_id: String,
        exchange_order_id: u64,
        executed_qty: f64,
        executed_notional: f64,
    ) -> Self {
        Self {
            client_order_id,
            status: OrderStatus::Accepted,
            exchange_order_id: Some(exchange_order_id),
            executed_qty: Some(executed_qty),
            executed_notional: Some(executed_notional),
            error: None,
        }
    }

    pub fn rejected(client_order_id: String, error: String) -> Self {
        Self {
            client_order_id,
            status: OrderStatus::Rejected,
            exchange_order_id: None,
            executed_qty: None,
            executed_notional: None,
            error: Some(error),
        }
    }

    pub fn failed(client_order_id: String, error: String) -> Self {
        Self {
            client_order_id,
            status: OrderStatus::Failed,
            exchange_order_id: None,
            executed_qty: None,
            executed_notional: None,
            error: Some(error),
        }
    }
}
