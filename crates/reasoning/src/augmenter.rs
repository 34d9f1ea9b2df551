use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use common::models::{AggregatedDecision, Direction, Rationale};

use crate::error::ReasoningError;
use crate::llm::LlmClient;

/// Largest confidence move the model may request, in either direction.
const MAX_CONFIDENCE_DELTA: f64 = 25.0;

/// Contributing signals quoted in the prompt before truncation.
const MAX_PROMPT_SIGNALS: usize = 12;

const SYSTEM_PROMPT: &str = "You are a trading analyst reviewing an automated \
signal aggregation. Respond with a single JSON object: \
{\"narrative\": string, \"confidence_delta\": number, \"direction\": \
\"long\"|\"short\"|\"flat\"}. narrative is a short plain-language rationale; \
confidence_delta adjusts the 0-100 confidence; direction is your own read of \
the evidence.";

#[derive(Debug, Deserialize)]
struct LlmVerdict {
    #[serde(default)]
    narrative: String,
    #[serde(default)]
    confidence_delta: f64,
    #[serde(default)]
    direction: Option<Direction>,
}

/// Sends an aggregated decision to the LLM capability for commentary and a
/// bounded confidence adjustment. Provider failure is tolerated: the caller
/// keeps the unmodified decision.
pub struct ReasoningAugmenter {
    client: Arc<dyn LlmClient>,
}

impl ReasoningAugmenter {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub async fn augment(
        &self,
        decision: &AggregatedDecision,
    ) -> Result<Rationale, ReasoningError> {
        let prompt = build_prompt(decision);
        let completion = self.client.complete(SYSTEM_PROMPT, &prompt).await?;

        let verdict: LlmVerdict =
            extract_json(&completion).ok_or(ReasoningError::EmptyCompletion)?;

        let delta = verdict
            .confidence_delta
            .clamp(-MAX_CONFIDENCE_DELTA, MAX_CONFIDENCE_DELTA);

        Ok(Rationale {
            ticker: decision.ticker.clone(),
            narrative: verdict.narrative,
            confidence_delta: delta,
            suggested_direction: verdict.direction,
        })
    }

    /// Fold a rationale into the decision. Confidence moves (clamped to
    /// 0-100); direction never changes here, and a disagreeing suggestion is
    /// logged so the flip is explicit, never silent.
    pub fn apply(decision: &AggregatedDecision, rationale: &Rationale) -> AggregatedDecision {
        if let Some(suggested) = rationale.suggested_direction {
            if suggested != decision.direction {
                warn!(
                    "{}: reasoning suggests {} against aggregate {}; keeping aggregate",
                    decision.ticker, suggested, decision.direction
                );
            }
        }

        let confidence = (decision.confidence + rationale.confidence_delta).clamp(0.0, 100.0);
        if confidence != decision.confidence {
            info!(
                "{}: reasoning moved confidence {:.1} -> {:.1}",
                decision.ticker, decision.confidence, confidence
            );
        }

        AggregatedDecision {
            confidence,
            ..decision.clone()
        }
    }
}

fn build_prompt(decision: &AggregatedDecision) -> String {
    let mut prompt = format!(
        "Ticker {t}: aggregated direction {d} with confidence {c:.1}/100 at {at}.\n\
         Contributing signals:\n",
        t = decision.ticker,
        d = decision.direction,
        c = decision.confidence,
        at = decision.at,
    );

    for signal in decision.signals.iter().take(MAX_PROMPT_SIGNALS) {
        prompt.push_str(&format!(
            "- {} on {}: {} strength {:.2}\n",
            signal.strategy, signal.interval, signal.direction, signal.strength
        ));
    }
    let omitted = decision.signals.len().saturating_sub(MAX_PROMPT_SIGNALS);
    if omitted > 0 {
        prompt.push_str(&format!("(and {} more signals omitted)\n", omitted));
    }

    prompt.push_str("Assess the decision and reply with the JSON object described.");
    prompt
}

/// Pull the first JSON object out of a completion that may wrap it in prose
/// or markdown fences.
fn extract_json(text: &str) -> Option<LlmVerdict> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use chrono::{DateTime, Utc};
    use common::models::{Interval, StrategySignal};

    fn decision(confidence: f64) -> AggregatedDecision {
        AggregatedDecision {
            ticker: "BTCUSDT".to_string(),
            direction: Direction::Long,
            confidence,
            signals: vec![StrategySignal {
                ticker: "BTCUSDT".to_string(),
                interval: Interval::Min5,
                strategy: "macd".to_string(),
                direction: Direction::Long,
                strength: 0.8,
                at: at(),
            }],
            at: at(),
        }
    }

    fn at() -> DateTime<Utc> {
        "2025-03-01T12:00:00Z".parse().unwrap()
    }

    #[tokio::test]
    async fn parses_fenced_completion() {
        let mut client = MockLlmClient::new();
        client.expect_complete().returning(|_, _| {
            Ok("```json\n{\"narrative\": \"trend intact\", \"confidence_delta\": 5, \
                \"direction\": \"long\"}\n```"
                .to_string())
        });

        let augmenter = ReasoningAugmenter::new(Arc::new(client));
        let rationale = augmenter.augment(&decision(60.0)).await.unwrap();

        assert_eq!(rationale.narrative, "trend intact");
        assert_eq!(rationale.confidence_delta, 5.0);
        assert_eq!(rationale.suggested_direction, Some(Direction::Long));
    }

    #[tokio::test]
    async fn oversized_delta_is_clamped() {
        let mut client = MockLlmClient::new();
        client.expect_complete().returning(|_, _| {
            Ok("{\"narrative\": \"!\", \"confidence_delta\": -90}".to_string())
        });

        let augmenter = ReasoningAugmenter::new(Arc::new(client));
        let rationale = augmenter.augment(&decision(60.0)).await.unwrap();
        assert_eq!(rationale.confidence_delta, -MAX_CONFIDENCE_DELTA);
    }

    #[tokio::test]
    async fn unparseable_completion_is_an_error() {
        let mut client = MockLlmClient::new();
        client
            .expect_complete()
            .returning(|_, _| Ok("cannot help with that".to_string()));

        let augmenter = ReasoningAugmenter::new(Arc::new(client));
        let err = augmenter.augment(&decision(60.0)).await.unwrap_err();
        assert!(matches!(err, ReasoningError::EmptyCompletion));
    }

    #[test]
    fn apply_clamps_resulting_confidence() {
        let rationale = Rationale {
            ticker: "BTCUSDT".to_string(),
            narrative: String::new(),
            confidence_delta: 25.0,
            suggested_direction: None,
        };
        let adjusted = ReasoningAugmenter::apply(&decision(90.0), &rationale);
        assert_eq!(adjusted.confidence, 100.0);

        let rationale_down = Rationale {
            confidence_delta: -25.0,
            ..rationale
        };
        let floored = ReasoningAugmenter::apply(&decision(10.0), &rationale_down);
        assert_eq!(floored.confidence, 0.0);
    }

    #[test]
    fn apply_never_flips_direction() {
        let rationale = Rationale {
            ticker: "BTCUSDT".to_string(),
            narrative: "disagree".to_string(),
            confidence_delta: 0.0,
            suggested_direction: Some(Direction::Short),
        };
        let adjusted = ReasoningAugmenter::apply(&decision(60.0), &rationale);
        assert_eq!(adjusted.direction, Direction::Long);
    }
}
