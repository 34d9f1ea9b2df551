use chrono::{DateTime, Utc};
use thiserror::Error;

use common::models::Interval;

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("exchange returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed exchange payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid numeric field: {0}")]
    Numeric(#[from] std::num::ParseFloatError),

    #[error("no bars for {ticker}/{interval} as of {as_of}")]
    DataUnavailable {
        ticker: String,
        interval: Interval,
        as_of: DateTime<Utc>,
    },

    #[error("missing credentials: {0}")]
    Credentials(String),
}

impl MarketDataError {
    /// Transport hiccups and rate limiting may succeed on a later attempt;
    /// everything else is final for this request.
    pub fn is_transient(&self) -> bool {
        match self {
            MarketDataError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            MarketDataError::Api { status, .. } => {
                *status == 429 || *status == 418 || *status >= 500
            }
            _ => false,
        }
    }
}
