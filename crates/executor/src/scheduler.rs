use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tokio::sync::{Semaphore, broadcast, watch};
use tracing::{info, warn};

use common::config::AppConfig;
use common::error::CellFailure;
use common::models::{AggregatedDecision, Interval, OrderResult, OrderStatus, Rationale};
use market_data::MarketDataGate;
use reasoning::ReasoningAugmenter;
use strategy::{SignalAggregator, StrategyRunner};

use crate::orders::OrderSubmitter;
use crate::risk::{Rejection, RiskGate};
use crate::state::ExecutionState;

const DEFAULT_TICKER_PARALLELISM: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    Idle,
    RunOnce,
    Scheduled,
    Terminated,
}

/// What happened to one ticker after its decision was made.
#[derive(Debug, Clone, PartialEq)]
pub enum TickerOutcome {
    /// An order reached the exchange; the result carries its status.
    Submitted(OrderResult),
    /// The risk gate stopped the decision. Expected and frequent.
    RiskRejected(Rejection),
    /// Execution is disabled; the signal pipeline still ran in full.
    ExecutionSkipped,
}

#[derive(Debug, Clone)]
pub struct TickerReport {
    pub ticker: String,
    pub decision: AggregatedDecision,
    pub rationale: Option<Rationale>,
    pub outcome: TickerOutcome,
    pub failures: Vec<CellFailure>,
}

#[derive(Debug, Clone)]
pub struct TickReport {
    pub at: DateTime<Utc>,
    pub tickers: Vec<TickerReport>,
}

/// The execution tail of the pipeline, present only when
/// `execution.enabled`.
pub struct ExecutionStage {
    pub risk: RiskGate,
    pub submitter: OrderSubmitter,
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub tickers: Vec<String>,
    pub intervals: Vec<Interval>,
    pub execution_interval: Option<Interval>,
    pub max_parallel_tickers: usize,
}

impl SchedulerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            tickers: config.signals.tickers.clone(),
            intervals: config.signals.intervals.clone(),
            execution_interval: config.execution.execution_interval,
            max_parallel_tickers: DEFAULT_TICKER_PARALLELISM,
        }
    }
}

/// Drives the whole pipeline: data refresh, strategy matrix, aggregation,
/// optional reasoning, risk gating and submission, on a single-shot or
/// repeating cadence.
///
/// Cancellation is cooperative and honored only between ticks, so an
/// in-flight submission always completes or definitively fails before the
/// run terminates.
pub struct Scheduler {
    settings: SchedulerSettings,
    gate: Arc<MarketDataGate>,
    runner: Arc<StrategyRunner>,
    aggregator: SignalAggregator,
    augmenter: Option<Arc<ReasoningAugmenter>>,
    execution: Option<ExecutionStage>,
    state: Arc<ExecutionState>,
    notify_tx: Option<broadcast::Sender<String>>,
    fanout: Arc<Semaphore>,
    phase: SchedulerPhase,
}

impl Scheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: SchedulerSettings,
        gate: Arc<MarketDataGate>,
        runner: Arc<StrategyRunner>,
        aggregator: SignalAggregator,
        augmenter: Option<Arc<ReasoningAugmenter>>,
        execution: Option<ExecutionStage>,
        state: Arc<ExecutionState>,
        notify_tx: Option<broadcast::Sender<String>>,
    ) -> Self {
        let fanout = Arc::new(Semaphore::new(settings.max_parallel_tickers.max(1)));
        Self {
            settings,
            gate,
            runner,
            aggregator,
            augmenter,
            execution,
            state,
            notify_tx,
            fanout,
            phase: SchedulerPhase::Idle,
        }
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    /// Run to termination. Returns the final tick's report.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Option<TickReport> {
        let mut last = None;

        match self.settings.execution_interval {
            None => {
                self.phase = SchedulerPhase::RunOnce;
                let report = self.tick(Utc::now()).await;
                self.log_summary(&report);
                last = Some(report);
            }
            Some(interval) => {
                self.phase = SchedulerPhase::Scheduled;
                info!("Scheduled execution every {}", interval);
                loop {
                    let boundary = next_boundary(Utc::now(), interval);
                    let wait = (boundary - Utc::now())
                        .to_std()
                        .unwrap_or(Duration::ZERO);

                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {
                            let report = self.tick(boundary).await;
                            self.log_summary(&report);
                            last = Some(report);
                        }
                        changed = shutdown.changed() => {
                            // A dropped sender counts as a stop signal.
                            if changed.is_err() || *shutdown.borrow() {
                                info!("Stop signal honored between ticks");
                                break;
                            }
                        }
                    }
                }
            }
        }

        self.phase = SchedulerPhase::Terminated;
        last
    }

    /// One full pass over every configured ticker.
    pub async fn tick(&self, at: DateTime<Utc>) -> TickReport {
        self.gate.begin_tick().await;

        let reports = join_all(
            self.settings
                .tickers
                .iter()
                .map(|ticker| self.run_ticker(ticker, at)),
        )
        .await;

        TickReport {
            at,
            tickers: reports,
        }
    }

    async fn run_ticker(&self, ticker: &str, at: DateTime<Utc>) -> TickerReport {
        let _permit = self
            .fanout
            .acquire()
            .await
            .expect("fanout semaphore closed while scheduler alive");

        let matrix = self
            .runner
            .run_ticker(&self.gate, ticker, &self.settings.intervals, at)
            .await;

        let mut decision = self.aggregator.aggregate(ticker, &matrix.signals, at);

        let mut rationale = None;
        if let Some(augmenter) = &self.augmenter {
            match augmenter.augment(&decision).await {
                Ok(r) => {
                    decision = ReasoningAugmenter::apply(&decision, &r);
                    rationale = Some(r);
                }
                // Tolerated: the original decision passes through unmodified.
                Err(e) => warn!("{}: reasoning unavailable: {}", ticker, e),
            }
        }

        let outcome = match &self.execution {
            None => TickerOutcome::ExecutionSkipped,
            Some(stage) => self.execute_decision(stage, &decision, at).await,
        };

        TickerReport {
            ticker: ticker.to_string(),
            decision,
            rationale,
            outcome,
            failures: matrix.failures,
        }
    }

    async fn execute_decision(
        &self,
        stage: &ExecutionStage,
        decision: &AggregatedDecision,
        at: DateTime<Utc>,
    ) -> TickerOutcome {
        let key = idempotency_key(&decision.ticker, at);

        let request = match stage.risk.evaluate(decision, &self.state, &key) {
            Ok(request) => request,
            Err(rejection) => {
                info!("{}: risk rejected: {}", decision.ticker, rejection);
                return TickerOutcome::RiskRejected(rejection);
            }
        };

        // Compare-and-set on the key: losing the race means another
        // submission for this ticker is still settling.
        if !self.state.reserve(&decision.ticker, &key) {
            return TickerOutcome::RiskRejected(Rejection::DuplicateSubmission { key });
        }

        let result = stage.submitter.submit(&request).await;
        match result.status {
            OrderStatus::Accepted => {
                self.state.commit(
                    &decision.ticker,
                    &key,
                    request.side,
                    result.executed_notional.unwrap_or(request.notional_usd),
                    result.executed_qty.unwrap_or(0.0),
                );
                self.notify(format!(
                    "{} {} {:.2} USD filled (confidence {:.0})",
                    decision.ticker,
                    request.side.as_str(),
                    request.notional_usd,
                    decision.confidence,
                ));
            }
            OrderStatus::Rejected | OrderStatus::Failed => {
                // Never advance state on a non-accepted outcome; a later tick
                // may retry under a fresh key.
                self.state.release(&decision.ticker, &key);
                self.notify(format!(
                    "{} {} {:.2} USD not executed: {}",
                    decision.ticker,
                    request.side.as_str(),
                    request.notional_usd,
                    result.error.as_deref().unwrap_or("unknown"),
                ));
            }
        }

        TickerOutcome::Submitted(result)
    }

    fn notify(&self, message: String) {
        if let Some(tx) = &self.notify_tx {
            let _ = tx.send(message);
        }
    }

    fn log_summary(&self, report: &TickReport) {
        let mut submitted = 0usize;
        let mut rejected = 0usize;
        let mut skipped = 0usize;
        let mut failures = 0usize;

        for ticker in &report.tickers {
            failures += ticker.failures.len();
            for failure in &ticker.failures {
                warn!("tick {}: {}", report.at, failure);
            }
            match &ticker.outcome {
                TickerOutcome::Submitted(_) => submitted += 1,
                TickerOutcome::RiskRejected(_) => rejected += 1,
                TickerOutcome::ExecutionSkipped => skipped += 1,
            }
            info!(
                "tick {}: {} -> {} (confidence {:.1})",
                report.at, ticker.ticker, ticker.decision.direction, ticker.decision.confidence
            );
        }

        info!(
            "tick {}: {} submitted, {} risk-rejected, {} skipped, {} cell failures",
            report.at, submitted, rejected, skipped, failures
        );
    }
}

/// Next cadence boundary strictly after `after`, aligned to epoch multiples
/// of the interval so per-tick latency cannot compound into drift.
pub fn next_boundary(after: DateTime<Utc>, interval: Interval) -> DateTime<Utc> {
    let step = interval.duration().as_secs() as i64;
    let next = (after.timestamp().div_euclid(step) + 1) * step;
    DateTime::from_timestamp(next, 0).expect("boundary timestamp in range")
}

fn idempotency_key(ticker: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}", ticker, at.timestamp())
}
