use mentor_core::config::AgentSettings;
use mentor_core::types::{AgentIdentity, ChatMessage, RoutingDecision, RoutingMethod, UsageMetrics};
use mentor_core::{Error, Result, UserContext};
use mentor_providers::Provider;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::agent::{AgentCore, InvokeOptions};
use crate::context::routing_user_turn;
use crate::intent::KeywordRouter;
use crate::pricing::PricingTable;
use crate::prompts;

const AI_ROUTING_TEMPERATURE: f32 = 0.2;
const AI_ROUTING_MAX_TOKENS: u32 = 150;

#[derive(Debug, Deserialize)]
struct AiVerdict {
    agent: String,
    confidence: f64,
    reasoning: String,
}

fn parse_verdict(content: &str, latency_ms: u64) -> Result<RoutingDecision> {
    let verdict: AiVerdict = serde_json::from_str(content.trim())
        .map_err(|e| Error::StructuredParse(format!("routing verdict: {}", e)))?;

    let agent: AgentIdentity = verdict
        .agent
        .parse()
        .map_err(|_| Error::StructuredParse(format!("routing verdict names unknown agent '{}'", verdict.agent)))?;

    if !verdict.confidence.is_finite() || !(0.0..=1.0).contains(&verdict.confidence) {
        return Err(Error::StructuredParse(format!(
            "routing confidence {} is outside [0, 1]",
            verdict.confidence
        )));
    }

    Ok(RoutingDecision {
        agent,
        confidence: verdict.confidence,
        reasoning: verdict.reasoning,
        should_use_rag: agent == AgentIdentity::TaxSpecialist,
        routing_method: RoutingMethod::Ai,
        latency_ms: Some(latency_ms),
    })
}

/// Picks the specialist for a message: keyword pass first, model-assisted
/// pass only when the keyword result is not confident enough.
pub struct Orchestrator {
    core: AgentCore,
    router: KeywordRouter,
    threshold: f64,
}

impl Orchestrator {
    pub fn new(
        settings: &AgentSettings,
        threshold: f64,
        provider: Arc<dyn Provider>,
        pricing: PricingTable,
    ) -> Self {
        Self {
            core: AgentCore::new("orchestrator", settings, prompts::ORCHESTRATOR, provider, pricing),
            router: KeywordRouter::new(),
            threshold,
        }
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn keyword_route(&self, message: &str) -> RoutingDecision {
        self.router.route(message)
    }

    pub fn should_use_multi_agent(&self, message: &str) -> bool {
        self.router.is_multi_intent(message)
    }

    /// Never fails: a broken AI pass degrades to the keyword decision.
    pub async fn route(&self, message: &str, ctx: Option<&UserContext>) -> RoutingDecision {
        let keyword = self.keyword_route(message);
        if keyword.confidence > self.threshold {
            debug!(agent = %keyword.agent, confidence = keyword.confidence, "Keyword routing accepted");
            return keyword;
        }

        match self.ai_route(message, ctx).await {
            Ok(decision) => {
                info!(
                    agent = %decision.agent,
                    confidence = decision.confidence,
                    latency_ms = decision.latency_ms.unwrap_or_default(),
                    "AI routing decided"
                );
                decision
            }
            Err(e) => {
                warn!(
                    cause = %e,
                    fallback = %keyword.agent,
                    "RoutingDegraded: AI routing failed, keeping keyword decision"
                );
                keyword
            }
        }
    }

    async fn ai_route(&self, message: &str, ctx: Option<&UserContext>) -> Result<RoutingDecision> {
        let messages = vec![
            ChatMessage::system(self.core.system_prompt()),
            ChatMessage::user(&routing_user_turn(message, ctx)),
        ];
        let out = self
            .core
            .invoke(
                messages,
                InvokeOptions::structured(AI_ROUTING_TEMPERATURE, Some(AI_ROUTING_MAX_TOKENS)),
            )
            .await?;
        parse_verdict(&out.content, out.latency_ms)
    }

    pub async fn metrics(&self) -> UsageMetrics {
        self.core.metrics().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{completion, ScriptedProvider};
    use mentor_core::config::AgentsConfig;

    fn orchestrator(provider: Arc<ScriptedProvider>) -> Orchestrator {
        let agents = AgentsConfig::default();
        Orchestrator::new(
            &agents.orchestrator,
            agents.keyword_confidence_threshold,
            provider,
            PricingTable::default(),
        )
    }

    #[tokio::test]
    async fn test_confident_keyword_skips_ai() {
        let provider = Arc::new(ScriptedProvider::replying(&[]));
        let orch = orchestrator(provider.clone());

        let d = orch.route("Explain partnership basis calculation", None).await;
        assert_eq!(d.agent, AgentIdentity::TaxSpecialist);
        assert_eq!(d.routing_method, RoutingMethod::Keyword);
        assert_eq!(provider.call_count(), 0);
        assert_eq!(orch.metrics().await.total_calls, 0);
    }

    #[tokio::test]
    async fn test_ambiguous_message_uses_ai() {
        let provider = Arc::new(ScriptedProvider::replying(&[
            r#"{"agent": "DATA_ANALYST", "confidence": 0.85, "reasoning": "asks about readiness"}"#,
        ]));
        let orch = orchestrator(provider.clone());

        let ctx = UserContext {
            ready_score: Some(87.0),
            ..UserContext::default()
        };
        let d = orch.route("am I ready yet", Some(&ctx)).await;

        assert_eq!(d.agent, AgentIdentity::DataAnalyst);
        assert_eq!(d.routing_method, RoutingMethod::Ai);
        assert!(!d.should_use_rag);
        assert!(d.latency_ms.is_some());

        let req = provider.last_request().unwrap();
        assert_eq!(req.temperature, 0.2);
        assert_eq!(req.max_tokens, 150);
        assert!(req.structured_output);
        assert_eq!(req.messages[1].content, "User message: am I ready yet\nUser's ReadyScore: 87");
        assert_eq!(orch.metrics().await.total_calls, 1);
    }

    #[tokio::test]
    async fn test_ai_tax_decision_enables_rag() {
        let provider = Arc::new(ScriptedProvider::replying(&[
            r#"{"agent": "TAX_SPECIALIST", "confidence": 0.7, "reasoning": "tax law"}"#,
        ]));
        let d = orchestrator(provider).route("tell me about this", None).await;
        assert_eq!(d.agent, AgentIdentity::TaxSpecialist);
        assert!(d.should_use_rag);
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_to_keyword() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(Error::Provider("down".to_string()))]));
        let orch = orchestrator(provider.clone());

        let message = "explain this quiz";
        let expected = orch.keyword_route(message);
        let d = orch.route(message, None).await;

        assert_eq!(d, expected);
        assert_eq!(provider.call_count(), 1);
        assert_eq!(orch.metrics().await.total_calls, 0);
    }

    #[tokio::test]
    async fn test_unknown_agent_falls_back() {
        let provider = Arc::new(ScriptedProvider::replying(&[
            r#"{"agent": "LIBRARIAN", "confidence": 0.9, "reasoning": "?"}"#,
        ]));
        let orch = orchestrator(provider);
        let d = orch.route("hello", None).await;
        assert_eq!(d.routing_method, RoutingMethod::KeywordDefault);
        assert_eq!(d.agent, AgentIdentity::TaxSpecialist);
    }

    #[tokio::test]
    async fn test_malformed_json_falls_back() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(completion("not json", 20, 5))]));
        let orch = orchestrator(provider);
        let d = orch.route("hello", None).await;
        assert_eq!(d.routing_method, RoutingMethod::KeywordDefault);
    }

    #[test]
    fn test_parse_verdict_rejects_bad_confidence() {
        let err = parse_verdict(r#"{"agent": "SOCRATIC_COACH", "confidence": 1.4, "reasoning": "x"}"#, 5).unwrap_err();
        assert!(matches!(err, Error::StructuredParse(_)));
    }

    #[test]
    fn test_parse_verdict_requires_all_fields() {
        assert!(parse_verdict(r#"{"agent": "SOCRATIC_COACH", "confidence": 0.9}"#, 5).is_err());
    }
}
