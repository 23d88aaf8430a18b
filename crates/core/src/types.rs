use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// One role-tagged turn sent to a completion provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    pub fn system(content: &str) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: &str) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: &str) -> Self {
        Self::new("assistant", content)
    }
}

/// Request handed to a completion provider.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// When set the provider must return syntactically valid JSON text.
    pub structured_output: bool,
}

/// Raw completion result with token accounting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    /// Provider-reported total. Some relays omit it.
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

impl Completion {
    pub fn tokens_used(&self) -> u64 {
        self.total_tokens
            .unwrap_or(self.prompt_tokens + self.completion_tokens)
    }
}

/// Specialists the orchestrator can route to.
///
/// Declaration order doubles as routing priority when keyword scores tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentIdentity {
    TaxSpecialist,
    SocraticCoach,
    DataAnalyst,
}

impl AgentIdentity {
    pub const ALL: [AgentIdentity; 3] = [
        AgentIdentity::TaxSpecialist,
        AgentIdentity::SocraticCoach,
        AgentIdentity::DataAnalyst,
    ];

    /// Wire label, e.g. `TAX_SPECIALIST`.
    pub fn label(&self) -> &'static str {
        match self {
            AgentIdentity::TaxSpecialist => "TAX_SPECIALIST",
            AgentIdentity::SocraticCoach => "SOCRATIC_COACH",
            AgentIdentity::DataAnalyst => "DATA_ANALYST",
        }
    }

    /// Instance name used in logs and metrics, e.g. `tax_specialist`.
    pub fn agent_name(&self) -> &'static str {
        match self {
            AgentIdentity::TaxSpecialist => "tax_specialist",
            AgentIdentity::SocraticCoach => "socratic_coach",
            AgentIdentity::DataAnalyst => "data_analyst",
        }
    }
}

impl fmt::Display for AgentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AgentIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        AgentIdentity::ALL
            .into_iter()
            .find(|a| a.label() == normalized)
            .ok_or_else(|| Error::Validation(format!("unknown agent '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMethod {
    Keyword,
    KeywordDefault,
    Ai,
}

/// Orchestrator output for a single request. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub agent: AgentIdentity,
    pub confidence: f64,
    pub reasoning: String,
    pub should_use_rag: bool,
    pub routing_method: RoutingMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// A passage returned by a retrieval backend, highest score first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    #[serde(alias = "source")]
    pub source_id: String,
    #[serde(default)]
    pub page: Option<i64>,
    pub text: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub topics: BTreeSet<String>,
}

/// Display-only reference derived from a retrieved passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub source: String,
    pub page: Option<i64>,
    pub text: String,
    pub relevance_score: f64,
}

/// Accepted case-insensitively on the wire, always written lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(Error::Validation(format!(
                "difficulty must be easy, medium or hard (got '{}')",
                other
            ))),
        }
    }
}

impl TryFrom<String> for Difficulty {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Practice question, either scraped from a narrative answer (possibly
/// partial) or produced by structured generation (complete).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeQuestion {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: Option<usize>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub irs_citation: Option<String>,
    #[serde(default)]
    pub common_trap: Option<String>,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
}

/// Running usage counters owned by one agent instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageMetrics {
    pub total_calls: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
}

impl UsageMetrics {
    pub fn record(&mut self, tokens: u64, cost: f64) {
        self.total_calls += 1;
        self.total_tokens += tokens;
        self.total_cost += cost.max(0.0);
    }

    pub fn avg_cost_per_call(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.total_cost / self.total_calls as f64
        }
    }
}

/// Uniform output shape every specialist can produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponseEnvelope {
    pub agent: AgentIdentity,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_identity_wire_format() {
        let json = serde_json::to_string(&AgentIdentity::SocraticCoach).unwrap();
        assert_eq!(json, "\"SOCRATIC_COACH\"");
        let parsed: AgentIdentity = serde_json::from_str("\"DATA_ANALYST\"").unwrap();
        assert_eq!(parsed, AgentIdentity::DataAnalyst);
    }

    #[test]
    fn test_agent_identity_from_str_is_lenient() {
        assert_eq!("tax_specialist".parse::<AgentIdentity>().unwrap(), AgentIdentity::TaxSpecialist);
        assert_eq!(" socratic-coach ".parse::<AgentIdentity>().unwrap(), AgentIdentity::SocraticCoach);
        assert!("LIBRARIAN".parse::<AgentIdentity>().is_err());
    }

    #[test]
    fn test_usage_metrics_average() {
        let mut m = UsageMetrics::default();
        assert_eq!(m.avg_cost_per_call(), 0.0);
        m.record(100, 0.002);
        m.record(300, 0.004);
        assert_eq!(m.total_calls, 2);
        assert_eq!(m.total_tokens, 400);
        assert!((m.avg_cost_per_call() - 0.003).abs() < 1e-12);
    }

    #[test]
    fn test_passage_accepts_source_alias() {
        let p: RetrievedPassage = serde_json::from_str(
            r#"{"source": "Pub 541", "page": 12, "text": "basis", "score": 0.8, "topics": ["partnerships"]}"#,
        )
        .unwrap();
        assert_eq!(p.source_id, "Pub 541");
        assert!(p.topics.contains("partnerships"));
    }

    #[test]
    fn test_difficulty_wire_format_is_lenient() {
        let d: Difficulty = serde_json::from_str("\"Medium\"").unwrap();
        assert_eq!(d, Difficulty::Medium);
        let d: Difficulty = serde_json::from_str("\" HARD \"").unwrap();
        assert_eq!(d, Difficulty::Hard);
        assert_eq!(serde_json::to_string(&Difficulty::Easy).unwrap(), "\"easy\"");
        assert!(serde_json::from_str::<Difficulty>("\"extreme\"").is_err());
    }

    #[test]
    fn test_completion_tokens_fallback() {
        let c = Completion {
            content: String::new(),
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: None,
        };
        assert_eq!(c.tokens_used(), 15);
    }
}
