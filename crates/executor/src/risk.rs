use thiserror::Error;

use common::models::{AggregatedDecision, Direction, OrderRequest, OrderSide};

use crate::state::ExecutionState;

/// Expected, frequent outcomes of the gate. Reported, never fatal.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Rejection {
    #[error("decision is flat")]
    FlatDecision,

    #[error("confidence {confidence:.1} below minimum {minimum:.1}")]
    ConfidenceBelowMinimum { confidence: f64, minimum: f64 },

    #[error("notional {notional:.2} above limit {limit:.2}")]
    NotionalAboveLimit { notional: f64, limit: f64 },

    #[error("duplicate submission for key {key}")]
    DuplicateSubmission { key: String },

    #[error("insufficient cash: required {required:.2}, free {free:.2}")]
    InsufficientCash { required: f64, free: f64 },
}

/// Validates a candidate order against the configured guards before any
/// money can move. Every rejection is an outcome for the tick report.
#[derive(Debug, Clone, Copy)]
pub struct RiskGate {
    min_confidence: f64,
    max_order_size: f64,
    margin_requirement: f64,
}

impl RiskGate {
    pub fn new(min_confidence: f64, max_order_size: f64, margin_requirement: f64) -> Self {
        Self {
            min_confidence,
            max_order_size,
            margin_requirement,
        }
    }

    /// Size a decision into an order and admit it through every guard.
    /// No request is ever constructed for a flat decision.
    pub fn evaluate(
        &self,
        decision: &AggregatedDecision,
        state: &ExecutionState,
        key: &str,
    ) -> Result<OrderRequest, Rejection> {
        let side = match decision.direction {
            Direction::Flat => return Err(Rejection::FlatDecision),
            Direction::Long => OrderSide::Buy,
            Direction::Short => OrderSide::Sell,
        };

        if decision.confidence < self.min_confidence {
            return Err(Rejection::ConfidenceBelowMinimum {
                confidence: decision.confidence,
                minimum: self.min_confidence,
            });
        }

        // Conviction-scaled sizing inside the configured ceiling.
        let notional = self.max_order_size * decision.confidence / 100.0;

        let request = OrderRequest {
            ticker: decision.ticker.clone(),
            side,
            notional_usd: notional,
            max_notional_usd: self.max_order_size,
            confidence: decision.confidence,
            client_order_id: key.to_string(),
        };

        self.admit(&request, state)?;
        Ok(request)
    }

    /// Guard checks for an already-sized request.
    pub fn admit(&self, request: &OrderRequest, state: &ExecutionState) -> Result<(), Rejection> {
        if request.notional_usd > self.max_order_size {
            return Err(Rejection::NotionalAboveLimit {
                notional: request.notional_usd,
                limit: self.max_order_size,
            });
        }

        if state.already_submitted(&request.ticker, &request.client_order_id) {
            return Err(Rejection::DuplicateSubmission {
                key: request.client_order_id.clone(),
            });
        }

        let snapshot = state.snapshot(&request.ticker);
        let required = match request.side {
            OrderSide::Buy => request.notional_usd,
            OrderSide::Sell => request.notional_usd * self.margin_requirement,
        };
        if required > snapshot.free_cash() {
            return Err(Rejection::InsufficientCash {
                required,
                free: snapshot.free_cash(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn decision(direction: Direction, confidence: f64) -> AggregatedDecision {
        AggregatedDecision {
            ticker: "BTCUSDT".to_string(),
            direction,
            confidence,
            signals: vec![],
            at: at(),
        }
    }

    fn at() -> DateTime<Utc> {
        "2025-03-01T12:00:00Z".parse().unwrap()
    }

    fn gate() -> RiskGate {
        RiskGate::new(70.0, 100.0, 0.5)
    }

    #[test]
    fn flat_decision_never_becomes_an_order() {
        let state = ExecutionState::new(10_000.0, 0.5);
        assert_eq!(
            gate().evaluate(&decision(Direction::Flat, 95.0), &state, "k"),
            Err(Rejection::FlatDecision)
        );
    }

    #[test]
    fn confidence_just_below_minimum_is_rejected() {
        let state = ExecutionState::new(10_000.0, 0.5);
        let err = gate()
            .evaluate(&decision(Direction::Long, 69.0), &state, "k")
            .unwrap_err();
        assert_eq!(
            err,
            Rejection::ConfidenceBelowMinimum {
                confidence: 69.0,
                minimum: 70.0
            }
        );
    }

    #[test]
    fn confidence_at_minimum_proceeds() {
        let state = ExecutionState::new(10_000.0, 0.5);
        let request = gate()
            .evaluate(&decision(Direction::Long, 70.0), &state, "k")
            .unwrap();
        assert_eq!(request.side, OrderSide::Buy);
        assert_eq!(request.notional_usd, 70.0);
        assert_eq!(request.client_order_id, "k");
    }

    #[test]
    fn notional_above_limit_is_rejected() {
        let state = ExecutionState::new(10_000.0, 0.5);
        let request = OrderRequest {
            ticker: "BTCUSDT".to_string(),
            side: OrderSide::Buy,
            notional_usd: 150.0,
            max_notional_usd: 100.0,
            confidence: 90.0,
            client_order_id: "k".to_string(),
        };
        assert_eq!(
            gate().admit(&request, &state),
            Err(Rejection::NotionalAboveLimit {
                notional: 150.0,
                limit: 100.0
            })
        );
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let state = ExecutionState::new(10_000.0, 0.5);
        state.reserve("BTCUSDT", "k");
        let err = gate()
            .evaluate(&decision(Direction::Long, 90.0), &state, "k")
            .unwrap_err();
        assert_eq!(err, Rejection::DuplicateSubmission { key: "k".to_string() });
    }

    #[test]
    fn insufficient_cash_is_rejected() {
        let state = ExecutionState::new(50.0, 0.5);
        let err = gate()
            .evaluate(&decision(Direction::Long, 100.0), &state, "k")
            .unwrap_err();
        assert_eq!(
            err,
            Rejection::InsufficientCash {
                required: 100.0,
                free: 50.0
            }
        );
    }

    #[test]
    fn short_orders_require_margin_only() {
        // 100 notional short at 0.5 margin needs 50 free cash.
        let state = ExecutionState::new(60.0, 0.5);
        let request = gate()
            .evaluate(&decision(Direction::Short, 100.0), &state, "k")
            .unwrap();
        assert_eq!(request.side, OrderSide::Sell);
    }
}
