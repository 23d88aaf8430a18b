use chrono::{DateTime, Utc};
use mentor_core::message::ChatMetadata;
use mentor_core::types::{AgentIdentity, PracticeQuestion};
use mentor_core::{ChatReply, ChatRequest, Config, Error, QuestionRequest, Result};
use mentor_providers::{Provider, Retriever};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::agent::Agent;
use crate::metrics::MetricsReport;
use crate::orchestrator::Orchestrator;
use crate::pricing::PricingTable;
use crate::specialist::TaxSpecialist;

pub const FOLLOW_UP_SUGGESTIONS: [&str; 3] = [
    "Can you explain this with an example?",
    "What are common exam traps for this topic?",
    "Generate a practice question on this",
];

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub version: String,
    pub agents: BTreeMap<String, String>,
    pub retrieval: bool,
    pub timestamp: DateTime<Utc>,
}

/// Application context shared by every request.
pub struct MentorRuntime {
    orchestrator: Orchestrator,
    tax_specialist: TaxSpecialist,
}

impl MentorRuntime {
    pub fn new(orchestrator: Orchestrator, tax_specialist: TaxSpecialist) -> Self {
        Self {
            orchestrator,
            tax_specialist,
        }
    }

    /// Wires both agents from config. The two providers may be the same
    /// backend; they are separate so each agent can target its own model host.
    pub fn from_config(
        config: &Config,
        orchestrator_provider: Arc<dyn Provider>,
        specialist_provider: Arc<dyn Provider>,
        retriever: Option<Arc<dyn Retriever>>,
    ) -> Self {
        let pricing = PricingTable::from_config(&config.pricing);
        let orchestrator = Orchestrator::new(
            &config.agents.orchestrator,
            config.agents.keyword_confidence_threshold,
            orchestrator_provider,
            pricing.clone(),
        );
        let tax_specialist = TaxSpecialist::new(
            &config.agents.tax_specialist,
            specialist_provider,
            retriever,
            config.rag.top_k,
            pricing,
        );
        Self::new(orchestrator, tax_specialist)
    }

    /// Only the tax specialist is implemented; other identities are served by it.
    fn specialist_for(&self, agent: AgentIdentity) -> &dyn Agent {
        match agent {
            AgentIdentity::TaxSpecialist => &self.tax_specialist,
            other => {
                info!(requested = %other, "Specialist not available, dispatching to tax specialist");
                &self.tax_specialist
            }
        }
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(Error::Validation("Message is required".to_string()));
        }
        let ctx = request.context.as_ref();

        let routing = self.orchestrator.route(message, ctx).await;
        let multi_agent = self.orchestrator.should_use_multi_agent(message);
        if multi_agent {
            info!(primary = %routing.agent, "Message spans several intents, answering with primary agent");
        }

        let specialist = self.specialist_for(routing.agent);
        let answer = specialist.process(message, ctx).await?;

        info!(
            agent = %specialist.name(),
            method = ?routing.routing_method,
            tokens = answer.tokens_used,
            cost = answer.cost,
            "Chat request served"
        );

        Ok(ChatReply {
            routing,
            response: answer.content,
            citations: answer.citations,
            follow_up_suggestions: FOLLOW_UP_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            metadata: ChatMetadata {
                tokens_used: answer.tokens_used,
                latency_ms: answer.latency_ms,
                cost: answer.cost,
                multi_agent,
            },
        })
    }

    pub async fn generate_question(&self, request: &QuestionRequest) -> Result<PracticeQuestion> {
        let topic = request.topic.trim();
        if topic.is_empty() {
            return Err(Error::Validation("Topic is required".to_string()));
        }
        self.tax_specialist
            .generate_practice_question(topic, request.difficulty, request.user_context.as_ref())
            .await
    }

    pub async fn metrics(&self) -> MetricsReport {
        let orchestrator = self.orchestrator.metrics().await;
        let specialist = self.tax_specialist.metrics().await;
        MetricsReport::from_usage(&[
            (self.orchestrator.name(), orchestrator),
            (self.tax_specialist.name(), specialist),
        ])
    }

    pub fn health(&self) -> HealthReport {
        let mut agents = BTreeMap::new();
        agents.insert(self.orchestrator.name().to_string(), "online".to_string());
        agents.insert(self.tax_specialist.name().to_string(), "online".to_string());
        HealthReport {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            agents,
            retrieval: self.tax_specialist.has_retriever(),
            timestamp: Utc::now(),
        }
    }
}
