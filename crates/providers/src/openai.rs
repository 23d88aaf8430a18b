use async_trait::async_trait;
use mentor_core::types::{ChatMessage, Completion, CompletionRequest};
use mentor_core::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::client::{build_http_client, ProxySettings};
use crate::Provider;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Largest byte index <= `max_bytes` that lands on a char boundary.
fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> usize {
    if max_bytes >= s.len() {
        return s.len();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// Adapter for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    api_base: String,
}

impl OpenAIProvider {
    pub fn new(api_key: &str, api_base: Option<&str>, timeout: Duration) -> Self {
        Self::new_with_proxy(api_key, api_base, timeout, ProxySettings::default())
    }

    pub fn new_with_proxy(
        api_key: &str,
        api_base: Option<&str>,
        timeout: Duration,
        proxy: ProxySettings<'_>,
    ) -> Self {
        let api_base = api_base
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string();
        let client = build_http_client(proxy, &api_base, timeout);
        Self {
            client,
            api_key: api_key.to_string(),
            api_base,
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn build_body(request: &CompletionRequest) -> WireRequest<'_> {
        WireRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request
                .structured_output
                .then_some(ResponseFormat { kind: "json_object" }),
        }
    }

    fn parse_body(raw: &str) -> Result<Completion> {
        let parsed: WireResponse = serde_json::from_str(raw).map_err(|e| {
            let end = truncate_at_char_boundary(raw, 500);
            Error::Provider(format!("Failed to parse response: {}. Body: {}", e, &raw[..end]))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Provider("No choices in response".to_string()))?;

        let usage = parsed.usage.unwrap_or_default();
        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        })
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: Option<u64>,
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = Self::build_body(request);

        info!(
            url = %url,
            model = %request.model,
            messages_count = request.messages.len(),
            structured = request.structured_output,
            "Calling LLM"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Request failed: {}", e)))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| Error::Provider(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            let end = truncate_at_char_boundary(&raw, 500);
            error!(status = %status, body = %&raw[..end], "LLM API error");
            return Err(Error::Provider(format!("API error {}: {}", status, &raw[..end])));
        }

        let end = truncate_at_char_boundary(&raw, 200);
        debug!(body_len = raw.len(), preview = %&raw[..end], "LLM raw response");

        Self::parse_body(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(structured: bool) -> CompletionRequest {
        CompletionRequest {
            model: "gpt-3.5-turbo".to_string(),
            messages: vec![ChatMessage::system("route"), ChatMessage::user("hi")],
            temperature: 0.2,
            max_tokens: 150,
            structured_output: structured,
        }
    }

    #[test]
    fn test_structured_request_sets_json_object_format() {
        let req = request(true);
        let body = serde_json::to_value(OpenAIProvider::build_body(&req)).unwrap();
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["max_tokens"], 150);
        assert_eq!(body["messages"][1]["role"], "user");
    }

    #[test]
    fn test_plain_request_omits_format() {
        let req = request(false);
        let body = serde_json::to_value(OpenAIProvider::build_body(&req)).unwrap();
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_parse_body_reads_usage() {
        let raw = r#"{
  "choices": [{"message": {"role": "assistant", "content": "Basis starts with contributions."}}],
  "usage": {"prompt_tokens": 120, "completion_tokens": 40, "total_tokens": 160}
}"#;
        let c = OpenAIProvider::parse_body(raw).unwrap();
        assert_eq!(c.content, "Basis starts with contributions.");
        assert_eq!(c.tokens_used(), 160);
    }

    #[test]
    fn test_parse_body_without_total() {
        let raw = r#"{"choices": [{"message": {"content": "ok"}}], "usage": {"prompt_tokens": 3, "completion_tokens": 2}}"#;
        let c = OpenAIProvider::parse_body(raw).unwrap();
        assert_eq!(c.total_tokens, None);
        assert_eq!(c.tokens_used(), 5);
    }

    #[test]
    fn test_parse_body_rejects_empty_choices() {
        let err = OpenAIProvider::parse_body(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }

    #[test]
    fn test_truncate_at_char_boundary_multibyte() {
        let s = "§§§";
        assert_eq!(truncate_at_char_boundary(s, 3), 2);
        assert_eq!(truncate_at_char_boundary(s, 100), s.len());
    }

    #[test]
    fn test_api_base_trailing_slash_trimmed() {
        let p = OpenAIProvider::new("sk-test", Some("https://relay.example/v1/"), Duration::from_secs(5));
        assert_eq!(p.api_base(), "https://relay.example/v1");
    }
}
