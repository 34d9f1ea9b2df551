use std::collections::HashMap;
use std::sync::Mutex;

use common::models::OrderSide;

/// Point-in-time view handed to the risk gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioSnapshot {
    pub cash: f64,
    pub margin_used: f64,
    pub position_qty: f64,
}

impl PortfolioSnapshot {
    pub fn free_cash(&self) -> f64 {
        self.cash - self.margin_used
    }
}

#[derive(Debug, Default)]
struct TickerState {
    committed_key: Option<String>,
    in_flight: Option<String>,
    position_qty: f64,
}

#[derive(Debug)]
struct Inner {
    cash: f64,
    margin_used: f64,
    tickers: HashMap<String, TickerState>,
}

/// Process-wide execution state for exactly one scheduler run: created empty
/// at start, discarded at termination, never shared beyond it.
///
/// Duplicate protection is a compare-and-set reservation on the idempotency
/// key: `reserve` marks a submission in flight, and only `commit` (after an
/// accepted result) advances the committed key and the portfolio. A failed
/// submission is `release`d so a later tick may retry under a fresh key.
#[derive(Debug)]
pub struct ExecutionState {
    margin_requirement: f64,
    inner: Mutex<Inner>,
}

impl ExecutionState {
    pub fn new(initial_cash: f64, margin_requirement: f64) -> Self {
        Self {
            margin_requirement,
            inner: Mutex::new(Inner {
                cash: initial_cash,
                margin_used: 0.0,
                tickers: HashMap::new(),
            }),
        }
    }

    pub fn snapshot(&self, ticker: &str) -> PortfolioSnapshot {
        let inner = self.inner.lock().expect("execution state lock poisoned");
        let position_qty = inner
            .tickers
            .get(ticker)
            .map(|t| t.position_qty)
            .unwrap_or(0.0);
        PortfolioSnapshot {
            cash: inner.cash,
            margin_used: inner.margin_used,
            position_qty,
        }
    }

    /// Whether this key was already committed or is currently in flight.
    pub fn already_submitted(&self, ticker: &str, key: &str) -> bool {
        let inner = self.inner.lock().expect("execution state lock poisoned");
        inner
            .tickers
            .get(ticker)
            .map(|t| {
                t.committed_key.as_deref() == Some(key) || t.in_flight.as_deref() == Some(key)
            })
            .unwrap_or(false)
    }

    /// Compare-and-set: claims the key for submission. Returns false when the
    /// key was already committed or another submission is in flight for the
    /// ticker, in which case the caller must not submit.
    pub fn reserve(&self, ticker: &str, key: &str) -> bool {
        let mut inner = self.inner.lock().expect("execution state lock poisoned");
        let entry = inner.tickers.entry(ticker.to_string()).or_default();
        if entry.committed_key.as_deref() == Some(key) || entry.in_flight.is_some() {
            return false;
        }
        entry.in_flight = Some(key.to_string());
        true
    }

    /// Advance state after an accepted order. The single mutation point per
    /// (ticker, tick); called only once the outcome is known.
    pub fn commit(&self, ticker: &str, key: &str, side: OrderSide, notional: f64, qty: f64) {
        let margin_requirement = self.margin_requirement;
        let mut inner = self.inner.lock().expect("execution state lock poisoned");
        match side {
            OrderSide::Buy => inner.cash -= notional,
            OrderSide::Sell => {
                inner.cash += notional;
                inner.margin_used += notional * margin_requirement;
            }
        }
        let entry = inner.tickers.entry(ticker.to_string()).or_default();
        match side {
            OrderSide::Buy => entry.position_qty += qty,
            OrderSide::Sell => entry.position_qty -= qty,
        }
        entry.committed_key = Some(key.to_string());
        entry.in_flight = None;
    }

    /// Drop the reservation after a failed or rejected submission without
    /// advancing anything; the key stays usable state-wise for a fresh tick.
    pub fn release(&self, ticker: &str, key: &str) {
        let mut inner = self.inner.lock().expect("execution state lock poisoned");
        if let Some(entry) = inner.tickers.get_mut(ticker) {
            if entry.in_flight.as_deref() == Some(key) {
                entry.in_flight = None;
            }
        }
    }
}
