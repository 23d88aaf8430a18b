use async_trait::async_trait;
use chrono::Utc;
use mentor_core::config::AgentSettings;
use mentor_core::types::{
    AgentIdentity, AgentResponseEnvelope, ChatMessage, Citation, CompletionRequest, PracticeQuestion,
    UsageMetrics,
};
use mentor_core::{Error, Result, UserContext};
use mentor_providers::Provider;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::pricing::PricingTable;

/// Per-call overrides. Unset fields fall back to the agent's defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvokeOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub structured_output: bool,
}

impl InvokeOptions {
    pub fn structured(temperature: f32, max_tokens: Option<u32>) -> Self {
        Self {
            temperature: Some(temperature),
            max_tokens,
            structured_output: true,
        }
    }
}

/// Result of one successful completion call.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub content: String,
    pub tokens_used: u64,
    pub cost: f64,
    pub latency_ms: u64,
    pub model: String,
}

/// What a specialist hands back to the runtime for one message.
#[derive(Debug, Clone, Serialize)]
pub struct SpecialistAnswer {
    pub content: String,
    pub citations: Vec<Citation>,
    pub practice_question: Option<PracticeQuestion>,
    pub related_topics: Vec<String>,
    pub confidence: f64,
    pub tokens_used: u64,
    pub cost: f64,
    pub latency_ms: u64,
}

#[async_trait]
pub trait Agent: Send + Sync {
    fn identity(&self) -> AgentIdentity;

    fn name(&self) -> &str;

    async fn process(&self, message: &str, context: Option<&UserContext>) -> Result<SpecialistAnswer>;

    async fn metrics(&self) -> UsageMetrics;

    fn format_response(
        &self,
        content: &str,
        metadata: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> AgentResponseEnvelope {
        AgentResponseEnvelope {
            agent: self.identity(),
            content: content.to_string(),
            timestamp: Utc::now(),
            metadata,
        }
    }
}

/// Shared invocation mechanics owned by every agent instance: model
/// defaults, the completion backend, pricing and running usage counters.
pub struct AgentCore {
    name: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
    provider: Arc<dyn Provider>,
    pricing: PricingTable,
    metrics: Mutex<UsageMetrics>,
}

impl AgentCore {
    pub fn new(
        name: &str,
        settings: &AgentSettings,
        system_prompt: &str,
        provider: Arc<dyn Provider>,
        pricing: PricingTable,
    ) -> Self {
        Self {
            name: name.to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            system_prompt: system_prompt.to_string(),
            provider,
            pricing,
            metrics: Mutex::new(UsageMetrics::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Sends `messages` to the completion backend and records usage.
    /// Counters only move when the call succeeds.
    pub async fn invoke(&self, messages: Vec<ChatMessage>, opts: InvokeOptions) -> Result<Invocation> {
        if messages.is_empty() {
            return Err(Error::Validation(format!(
                "{} invoked with an empty message list",
                self.name
            )));
        }

        let request = CompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: opts.temperature.unwrap_or(self.temperature),
            max_tokens: opts.max_tokens.unwrap_or(self.max_tokens),
            structured_output: opts.structured_output,
        };

        debug!(
            agent = %self.name,
            model = %request.model,
            temperature = request.temperature,
            max_tokens = request.max_tokens,
            "Invoking completion"
        );

        let started = Instant::now();
        let completion = match self.provider.complete(&request).await {
            Ok(c) => c,
            Err(e) => {
                warn!(agent = %self.name, error = %e, "Completion call failed");
                return Err(Error::agent_invocation(&self.name, e));
            }
        };
        let latency_ms = started.elapsed().as_millis() as u64;

        let tokens_used = completion.tokens_used();
        let cost = self
            .pricing
            .cost(&self.model, completion.prompt_tokens, completion.completion_tokens);

        {
            let mut m = self.metrics.lock().await;
            m.record(tokens_used, cost);
        }

        info!(
            agent = %self.name,
            model = %self.model,
            tokens = tokens_used,
            cost,
            latency_ms,
            "Completion finished"
        );

        Ok(Invocation {
            content: completion.content,
            tokens_used,
            cost,
            latency_ms,
            model: self.model.clone(),
        })
    }

    pub async fn metrics(&self) -> UsageMetrics {
        *self.metrics.lock().await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{completion, ScriptedProvider};
    use super::*;
    use mentor_core::config::AgentsConfig;

    fn core_with(provider: Arc<ScriptedProvider>) -> AgentCore {
        AgentCore::new(
            "tax_specialist",
            &AgentsConfig::default().tax_specialist,
            "system",
            provider,
            PricingTable::default(),
        )
    }

    #[tokio::test]
    async fn test_invoke_records_usage_and_cost() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(completion("answer", 1000, 500))]));
        let core = core_with(provider.clone());

        let out = core
            .invoke(vec![ChatMessage::user("q")], InvokeOptions::default())
            .await
            .unwrap();

        assert_eq!(out.content, "answer");
        assert_eq!(out.tokens_used, 1500);
        assert!((out.cost - 0.025).abs() < 1e-12);
        assert_eq!(out.model, "gpt-4-turbo-preview");

        let m = core.metrics().await;
        assert_eq!(m.total_calls, 1);
        assert_eq!(m.total_tokens, 1500);

        let req = provider.last_request().unwrap();
        assert_eq!(req.temperature, 0.5);
        assert_eq!(req.max_tokens, 3000);
        assert!(!req.structured_output);
    }

    #[tokio::test]
    async fn test_overrides_replace_defaults() {
        let provider = Arc::new(ScriptedProvider::replying(&["{}"]));
        let core = core_with(provider.clone());

        core.invoke(vec![ChatMessage::user("q")], InvokeOptions::structured(0.2, Some(150)))
            .await
            .unwrap();

        let req = provider.last_request().unwrap();
        assert_eq!(req.temperature, 0.2);
        assert_eq!(req.max_tokens, 150);
        assert!(req.structured_output);
    }

    #[tokio::test]
    async fn test_failure_leaves_metrics_untouched() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(completion("first", 10, 10)),
            Err(Error::Provider("timeout".to_string())),
        ]));
        let core = core_with(provider);

        core.invoke(vec![ChatMessage::user("a")], InvokeOptions::default())
            .await
            .unwrap();
        let before = core.metrics().await;

        let err = core
            .invoke(vec![ChatMessage::user("b")], InvokeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AgentInvocation { ref agent, .. } if agent == "tax_specialist"));
        assert_eq!(core.metrics().await, before);
    }

    #[tokio::test]
    async fn test_empty_messages_rejected_without_call() {
        let provider = Arc::new(ScriptedProvider::replying(&["unused"]));
        let core = core_with(provider.clone());

        let err = core.invoke(Vec::new(), InvokeOptions::default()).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_total_uses_sum() {
        let mut c = completion("x", 7, 3);
        c.total_tokens = None;
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(c)]));
        let core = core_with(provider);
        let out = core
            .invoke(vec![ChatMessage::user("q")], InvokeOptions::default())
            .await
            .unwrap();
        assert_eq!(out.tokens_used, 10);
    }
}
