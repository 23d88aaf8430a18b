use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, Citation, Difficulty, RoutingDecision};

/// Optional per-user signals attached to a chat or generation request.
/// The pipeline treats them as opaque prompt decorations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    #[serde(default)]
    pub ready_score: Option<f64>,
    #[serde(default)]
    pub exam_part: Option<u8>,
    #[serde(default)]
    pub weak_areas: Option<Vec<String>>,
    #[serde(default)]
    pub recent_topics: Option<Vec<String>>,
    #[serde(default)]
    pub conversation_history: Option<Vec<ChatMessage>>,
    /// Weak areas are only spliced into specialist prompts when this is set.
    #[serde(default)]
    pub request_focus: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub context: Option<UserContext>,
}

impl ChatRequest {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: UserContext) -> Self {
        self.context = Some(context);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatMetadata {
    pub tokens_used: u64,
    pub latency_ms: u64,
    pub cost: f64,
    /// Set when the message reads as several intents at once.
    #[serde(default)]
    pub multi_agent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub routing: RoutingDecision,
    pub response: String,
    pub citations: Vec<Citation>,
    pub follow_up_suggestions: Vec<String>,
    pub metadata: ChatMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub user_context: Option<UserContext>,
}

impl QuestionRequest {
    pub fn new(topic: &str, difficulty: Difficulty) -> Self {
        Self {
            topic: topic.to_string(),
            difficulty,
            user_context: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_parses_partial_context() {
        let raw = r#"{
  "message": "Explain S-Corporation taxation",
  "context": { "ready_score": 87, "exam_part": 2, "weak_areas": ["partnerships"] }
}"#;
        let req: ChatRequest = serde_json::from_str(raw).unwrap();
        let ctx = req.context.unwrap();
        assert_eq!(ctx.ready_score, Some(87.0));
        assert_eq!(ctx.exam_part, Some(2));
        assert_eq!(ctx.weak_areas.as_deref(), Some(&["partnerships".to_string()][..]));
        assert!(!ctx.request_focus);
        assert!(ctx.conversation_history.is_none());
    }

    #[test]
    fn test_question_request_defaults_to_medium() {
        let req: QuestionRequest = serde_json::from_str(r#"{"topic": "partnership_basis"}"#).unwrap();
        assert_eq!(req.difficulty, Difficulty::Medium);
    }
}
