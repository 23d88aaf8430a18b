use async_trait::async_trait;
use mentor_core::config::AgentSettings;
use mentor_core::types::{
    AgentIdentity, ChatMessage, Citation, Difficulty, PracticeQuestion, RetrievedPassage, UsageMetrics,
};
use mentor_core::{Error, Result, UserContext};
use mentor_providers::{Provider, Retriever};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::agent::{Agent, AgentCore, InvokeOptions, SpecialistAnswer};
use crate::context::{self, truncate_chars, MAX_EXCERPTS};
use crate::metrics::round2;
use crate::pricing::PricingTable;
use crate::prompts;

const CITATION_CHARS: usize = 200;
const MAX_RELATED_TOPICS: usize = 3;
const QUESTION_REFERENCES: usize = 2;
const QUESTION_TEMPERATURE: f32 = 0.7;
const QUESTION_OPTIONS: usize = 4;

static PRACTICE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\*\*Practice Question:\*\*\s*(.+?)(?:\*\*|$)").expect("practice block regex is valid")
});
static OPTION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\(?([A-Da-d])[\).:]\s+(.+?)\s*$").expect("option line regex is valid"));
static ANSWER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:correct\s+)?answer\s*[:\-]\s*\(?([A-D])\b").expect("answer line regex is valid")
});
static EXPLANATION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*explanation\s*:\s*(.*)$").expect("explanation line regex is valid"));

fn letter_index(letter: &str) -> Option<usize> {
    match letter.to_ascii_uppercase().as_str() {
        "A" => Some(0),
        "B" => Some(1),
        "C" => Some(2),
        "D" => Some(3),
        _ => None,
    }
}

/// Scrapes an embedded practice question out of a narrative answer.
///
/// Options, answer and explanation are filled when the block uses the usual
/// `A)` / `Answer: B` / `Explanation:` layout; anything else stays in the stem.
pub fn extract_practice_question(content: &str) -> Option<PracticeQuestion> {
    let block = PRACTICE_BLOCK
        .captures(content)?
        .get(1)?
        .as_str()
        .trim();
    if block.is_empty() {
        return None;
    }

    let mut stem = Vec::new();
    let mut options = Vec::new();
    let mut correct_answer = None;
    let mut explanation: Vec<&str> = Vec::new();
    let mut in_explanation = false;

    for line in block.lines() {
        if in_explanation {
            explanation.push(line.trim());
            continue;
        }
        if let Some(caps) = EXPLANATION_LINE.captures(line) {
            in_explanation = true;
            if let Some(first) = caps.get(1) {
                explanation.push(first.as_str().trim());
            }
        } else if let Some(caps) = ANSWER_LINE.captures(line) {
            correct_answer = caps.get(1).and_then(|m| letter_index(m.as_str()));
        } else if let Some(caps) = OPTION_LINE.captures(line) {
            if let (Some(letter), Some(text)) = (caps.get(1), caps.get(2)) {
                options.push(format!("{}) {}", letter.as_str().to_ascii_uppercase(), text.as_str()));
            }
        } else if options.is_empty() {
            stem.push(line.trim());
        }
    }

    let stem = stem.join("\n").trim().to_string();
    let correct_answer = correct_answer.filter(|i| *i < options.len());

    Some(PracticeQuestion {
        question: if stem.is_empty() { block.to_string() } else { stem },
        options,
        correct_answer,
        explanation: explanation.join("\n").trim().to_string(),
        irs_citation: None,
        common_trap: None,
        topic: String::new(),
        difficulty: Difficulty::Medium,
    })
}

pub fn build_citations(passages: &[RetrievedPassage]) -> Vec<Citation> {
    passages
        .iter()
        .take(MAX_EXCERPTS)
        .map(|p| Citation {
            source: p.source_id.clone(),
            page: p.page,
            text: format!("{}...", truncate_chars(&p.text, CITATION_CHARS)),
            relevance_score: p.score,
        })
        .collect()
}

pub fn related_topics(passages: &[RetrievedPassage]) -> Vec<String> {
    let all: BTreeSet<&String> = passages.iter().flat_map(|p| p.topics.iter()).collect();
    all.into_iter().take(MAX_RELATED_TOPICS).cloned().collect()
}

/// 0.5 without excerpts, otherwise 0.6 + 0.4 x mean of the top three scores.
pub fn answer_confidence(passages: &[RetrievedPassage]) -> f64 {
    let top: Vec<f64> = passages
        .iter()
        .take(MAX_EXCERPTS)
        .map(|p| if p.score.is_finite() { p.score.clamp(0.0, 1.0) } else { 0.0 })
        .collect();
    if top.is_empty() {
        return 0.5;
    }
    let mean = top.iter().sum::<f64>() / top.len() as f64;
    round2(0.6 + 0.4 * mean)
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    question: String,
    options: Vec<String>,
    correct_answer: usize,
    explanation: String,
    #[serde(default)]
    irs_citation: Option<String>,
    #[serde(default)]
    common_trap: Option<String>,
}

fn parse_generated(content: &str, topic: &str, difficulty: Difficulty) -> Result<PracticeQuestion> {
    let raw: GeneratedQuestion = serde_json::from_str(content.trim())
        .map_err(|e| Error::StructuredParse(format!("practice question: {}", e)))?;

    if raw.question.trim().is_empty() {
        return Err(Error::StructuredParse("practice question has an empty stem".to_string()));
    }
    if raw.options.len() != QUESTION_OPTIONS {
        return Err(Error::StructuredParse(format!(
            "practice question needs {} options, got {}",
            QUESTION_OPTIONS,
            raw.options.len()
        )));
    }
    if raw.correct_answer >= raw.options.len() {
        return Err(Error::StructuredParse(format!(
            "correct_answer {} is out of range for {} options",
            raw.correct_answer,
            raw.options.len()
        )));
    }

    Ok(PracticeQuestion {
        question: raw.question,
        options: raw.options,
        correct_answer: Some(raw.correct_answer),
        explanation: raw.explanation,
        irs_citation: raw.irs_citation,
        common_trap: raw.common_trap,
        topic: topic.to_string(),
        difficulty,
    })
}

/// Retrieval-grounded tax law specialist.
pub struct TaxSpecialist {
    core: AgentCore,
    retriever: Option<Arc<dyn Retriever>>,
    top_k: usize,
}

impl TaxSpecialist {
    pub fn new(
        settings: &AgentSettings,
        provider: Arc<dyn Provider>,
        retriever: Option<Arc<dyn Retriever>>,
        top_k: usize,
        pricing: PricingTable,
    ) -> Self {
        Self {
            core: AgentCore::new(
                AgentIdentity::TaxSpecialist.agent_name(),
                settings,
                prompts::TAX_SPECIALIST,
                provider,
                pricing,
            ),
            retriever,
            top_k,
        }
    }

    pub fn has_retriever(&self) -> bool {
        self.retriever.is_some()
    }

    /// Retrieval problems are logged and read as "no excerpts".
    async fn retrieve(&self, query: &str, top_k: usize) -> Vec<RetrievedPassage> {
        let Some(retriever) = &self.retriever else {
            return Vec::new();
        };
        match retriever.search(query, top_k).await {
            Ok(mut passages) => {
                passages.truncate(top_k);
                debug!(agent = %self.core.name(), hits = passages.len(), "Retrieved excerpts");
                passages
            }
            Err(e) => {
                warn!(agent = %self.core.name(), error = %e, "Retrieval unavailable, answering without excerpts");
                Vec::new()
            }
        }
    }

    pub async fn generate_practice_question(
        &self,
        topic: &str,
        difficulty: Difficulty,
        ctx: Option<&UserContext>,
    ) -> Result<PracticeQuestion> {
        let references = self
            .retrieve(&format!("{} example calculation", topic), QUESTION_REFERENCES)
            .await;

        let messages = vec![
            ChatMessage::system(self.core.system_prompt()),
            ChatMessage::user(&context::question_prompt(topic, difficulty, &references, ctx)),
        ];
        let out = self
            .core
            .invoke(messages, InvokeOptions::structured(QUESTION_TEMPERATURE, None))
            .await?;

        let question = parse_generated(&out.content, topic, difficulty)?;
        info!(
            agent = %self.core.name(),
            topic = %topic,
            difficulty = %difficulty,
            options = question.options.len(),
            "Generated practice question"
        );
        Ok(question)
    }
}

#[async_trait]
impl Agent for TaxSpecialist {
    fn identity(&self) -> AgentIdentity {
        AgentIdentity::TaxSpecialist
    }

    fn name(&self) -> &str {
        self.core.name()
    }

    async fn process(&self, message: &str, ctx: Option<&UserContext>) -> Result<SpecialistAnswer> {
        let passages = self.retrieve(message, self.top_k).await;

        let user_turn = context::specialist_user_turn(message, &passages, ctx);
        let history = ctx.and_then(|c| c.conversation_history.as_deref());
        let messages = context::splice_history(self.core.system_prompt(), user_turn, history);

        let out = self.core.invoke(messages, InvokeOptions::default()).await?;

        Ok(SpecialistAnswer {
            practice_question: extract_practice_question(&out.content),
            citations: build_citations(&passages),
            related_topics: related_topics(&passages),
            confidence: answer_confidence(&passages),
            content: out.content,
            tokens_used: out.tokens_used,
            cost: out.cost,
            latency_ms: out.latency_ms,
        })
    }

    async fn metrics(&self) -> UsageMetrics {
        self.core.metrics().await
    }
}
