use std::sync::Arc;

use anyhow::{Context, bail};
use dotenvy::dotenv;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};
use uuid::Uuid;

use common::config::{AppConfig, Mode};
use common::logger;
use market_data::MarketDataGate;
use market_data::remote::{BinanceClient, BinancePoller};
use reasoning::{LlmConfig, OpenAiCompatClient, ReasoningAugmenter};
use strategy::{SignalAggregator, StrategyRunner};

use executor::notifier::TelegramNotifier;
use executor::orders::{BinanceExchange, OrderSubmitter};
use executor::risk::RiskGate;
use executor::scheduler::{ExecutionStage, Scheduler, SchedulerSettings, TickerOutcome};
use executor::state::ExecutionState;

/// Bars fetched per (ticker, interval) series; enough for the slowest
/// indicator to warm up with headroom.
const BAR_HISTORY: usize = 120;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logger::setup_logger();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            bail!("configuration rejected");
        }
    };

    info!(
        "Run {} starting ({} tickers, {} intervals, {} strategies)",
        Uuid::new_v4(),
        config.signals.tickers.len(),
        config.signals.intervals.len(),
        config.signals.strategies.len(),
    );

    let runner = match StrategyRunner::from_names(&config.signals.strategies) {
        Ok(runner) => Arc::new(runner),
        Err(e) => {
            error!("{}", e);
            bail!("configuration rejected");
        }
    };
    let aggregator =
        SignalAggregator::new(config.signals.intervals.len(), runner.strategy_count());

    let gate = Arc::new(MarketDataGate::new(
        Arc::new(BinancePoller::from_env()),
        BAR_HISTORY,
    ));

    let state = Arc::new(ExecutionState::new(
        config.initial_cash,
        config.margin_requirement,
    ));

    let augmenter = if config.show_reasoning {
        match OpenAiCompatClient::new(LlmConfig::from_model_config(&config.model)) {
            Ok(client) => Some(Arc::new(ReasoningAugmenter::new(Arc::new(client)))),
            Err(e) => {
                warn!("Reasoning disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    let execution = if config.execution.enabled && config.mode == Mode::Live {
        warn!(
            "Live order execution is enabled (testnet: {}, max order size: {:.2}, min confidence: {:.0})",
            config.execution.testnet,
            config.execution.max_order_size.unwrap_or_default(),
            config.execution.min_confidence.unwrap_or_default(),
        );

        let client =
            BinanceClient::from_env(config.execution.testnet).context("exchange credentials")?;
        let account = client
            .get_account()
            .await
            .context("failed to verify exchange account")?;
        info!("Exchange account connected. Can trade: {}", account.can_trade);

        // Guards were validated present at load.
        let risk = RiskGate::new(
            config.execution.min_confidence.unwrap_or_default(),
            config.execution.max_order_size.unwrap_or_default(),
            config.margin_requirement,
        );
        let submitter = OrderSubmitter::new(Arc::new(BinanceExchange::new(client)));
        Some(ExecutionStage { risk, submitter })
    } else {
        None
    };

    let notify_tx = TelegramNotifier::from_env().map(|notifier| {
        let (tx, rx) = broadcast::channel(128);
        tokio::spawn(notifier.run(rx));
        tx
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Stop signal received; terminating at next safe boundary");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut scheduler = Scheduler::new(
        SchedulerSettings::from_config(&config),
        gate,
        runner,
        aggregator,
        augmenter,
        execution,
        state,
        notify_tx,
    );

    let last = match config.mode {
        Mode::Backtest => {
            info!("Backtest mode: single dry pass as of {}", config.end_date);
            Some(scheduler.tick(config.end_date).await)
        }
        Mode::Live => scheduler.run(shutdown_rx).await,
    };

    if let Some(report) = last {
        for ticker in &report.tickers {
            let outcome = match &ticker.outcome {
                TickerOutcome::Submitted(result) => format!("{:?}", result.status),
                TickerOutcome::RiskRejected(rejection) => rejection.to_string(),
                TickerOutcome::ExecutionSkipped => "execution skipped".to_string(),
            };
            info!(
                "{}: {} (confidence {:.1}) -> {}",
                ticker.ticker, ticker.decision.direction, ticker.decision.confidence, outcome
            );
            if let Some(rationale) = &ticker.rationale {
                info!("{}: {}", ticker.ticker, rationale.narrative);
            }
        }
    }

    Ok(())
}
