use async_trait::async_trait;
use mentor_core::types::RetrievedPassage;
use mentor_core::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::client::{build_http_client, ProxySettings};
use crate::Retriever;

/// Client for a remote search service exposing `POST {base}/search`.
pub struct HttpRetriever {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    Bare(Vec<RetrievedPassage>),
    Wrapped { results: Vec<RetrievedPassage> },
}

impl HttpRetriever {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration, proxy: ProxySettings<'_>) -> Self {
        let base = base_url.trim_end_matches('/');
        let client = build_http_client(proxy, base, timeout);
        Self {
            client,
            endpoint: format!("{}/search", base),
            api_key: api_key.filter(|k| !k.is_empty()).map(str::to_string),
        }
    }

    fn parse_results(raw: &str, top_k: usize) -> Result<Vec<RetrievedPassage>> {
        let parsed: SearchResponse = serde_json::from_str(raw)
            .map_err(|e| Error::RetrievalUnavailable(format!("malformed search response: {}", e)))?;
        let mut passages = match parsed {
            SearchResponse::Bare(p) => p,
            SearchResponse::Wrapped { results } => results,
        };
        rank(&mut passages, top_k);
        Ok(passages)
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedPassage>> {
        debug!(endpoint = %self.endpoint, top_k, "Searching reference passages");

        let mut req = self.client.post(&self.endpoint).json(&SearchBody { query, top_k });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| Error::RetrievalUnavailable(format!("search request failed: {}", e)))?;
        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| Error::RetrievalUnavailable(format!("search body unreadable: {}", e)))?;

        if !status.is_success() {
            return Err(Error::RetrievalUnavailable(format!("search returned {}", status)));
        }

        Self::parse_results(&raw, top_k)
    }
}

/// Sorts by score descending and keeps the first `top_k`.
fn rank(passages: &mut Vec<RetrievedPassage>, top_k: usize) {
    passages.sort_by(|a, b| b.score.total_cmp(&a.score));
    passages.truncate(top_k);
}

fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 3)
        .map(str::to_lowercase)
        .collect()
}

/// In-memory passage corpus loaded from a JSON-lines file, ranked by the
/// share of distinct query terms each passage contains.
pub struct CorpusRetriever {
    passages: Vec<(RetrievedPassage, BTreeSet<String>)>,
}

impl CorpusRetriever {
    pub fn from_passages(passages: Vec<RetrievedPassage>) -> Self {
        let passages = passages
            .into_iter()
            .map(|p| {
                let t = terms(&p.text);
                (p, t)
            })
            .collect();
        Self { passages }
    }

    /// Loads one passage per line. Blank and malformed lines are skipped.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut passages = Vec::new();
        let mut skipped = 0usize;

        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<RetrievedPassage>(line) {
                Ok(p) => passages.push(p),
                Err(e) => {
                    skipped += 1;
                    warn!(line = idx + 1, error = %e, "Skipping malformed corpus line");
                }
            }
        }

        info!(path = %path.display(), passages = passages.len(), skipped, "Loaded passage corpus");
        Ok(Self::from_passages(passages))
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

#[async_trait]
impl Retriever for CorpusRetriever {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedPassage>> {
        let wanted = terms(query);
        if wanted.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<RetrievedPassage> = self
            .passages
            .iter()
            .filter_map(|(passage, have)| {
                let overlap = wanted.intersection(have).count();
                if overlap == 0 {
                    return None;
                }
                let mut hit = passage.clone();
                hit.score = overlap as f64 / wanted.len() as f64;
                Some(hit)
            })
            .collect();

        rank(&mut hits, top_k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(source: &str, text: &str) -> RetrievedPassage {
        RetrievedPassage {
            source_id: source.to_string(),
            page: Some(1),
            text: text.to_string(),
            score: 0.0,
            topics: BTreeSet::new(),
        }
    }

    #[test]
    fn test_parse_bare_array_ranks_and_truncates() {
        let raw = r#"[
  {"source": "Pub 17", "text": "a", "score": 0.2},
  {"source_id": "Pub 541", "text": "b", "score": 0.9},
  {"source": "Pub 946", "text": "c", "score": 0.5}
]"#;
        let out = HttpRetriever::parse_results(raw, 2).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].source_id, "Pub 541");
        assert_eq!(out[1].source_id, "Pub 946");
    }

    #[test]
    fn test_parse_wrapped_results() {
        let raw = r#"{"results": [{"source": "Pub 535", "page": 4, "text": "ordinary and necessary", "score": 0.7}]}"#;
        let out = HttpRetriever::parse_results(raw, 5).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].page, Some(4));
    }

    #[test]
    fn test_parse_garbage_is_retrieval_unavailable() {
        let err = HttpRetriever::parse_results("<html>", 5).unwrap_err();
        assert!(matches!(err, Error::RetrievalUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_retrieval_unavailable() {
        let r = HttpRetriever::new("http://127.0.0.1:9", None, Duration::from_secs(2), ProxySettings::default());
        let err = r.search("basis", 3).await.unwrap_err();
        assert!(matches!(err, Error::RetrievalUnavailable(_)));
    }

    #[tokio::test]
    async fn test_corpus_ranks_by_term_overlap() {
        let corpus = CorpusRetriever::from_passages(vec![
            passage("Pub 541", "A partner's outside basis increases by contributions."),
            passage("Pub 946", "Depreciation of business property under MACRS."),
            passage("Pub 541", "Partnership basis adjustments and partner distributions."),
        ]);

        let hits = corpus.search("partnership basis distributions", 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].text.starts_with("Partnership basis"));
        assert!((hits[0].score - 1.0).abs() < 1e-9);
        assert!((hits[1].score - 1.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_corpus_honors_top_k_and_drops_misses() {
        let corpus = CorpusRetriever::from_passages(vec![
            passage("a", "basis basis"),
            passage("b", "basis of property"),
            passage("c", "unrelated words here"),
        ]);
        let hits = corpus.search("basis", 1).await.unwrap();
        assert_eq!(hits.len(), 1);

        let none = corpus.search("depletion", 5).await.unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_load_skips_bad_lines() {
        let dir = std::env::temp_dir().join("test_mentor_corpus_load");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("passages.jsonl");
        std::fs::write(
            &path,
            "{\"source\": \"Pub 17\", \"text\": \"standard deduction\", \"topics\": [\"deductions\"]}\n\nnot json\n",
        )
        .unwrap();

        let corpus = CorpusRetriever::load(&path).unwrap();
        assert_eq!(corpus.len(), 1);
        assert!(!corpus.is_empty());
        assert!(CorpusRetriever::from_passages(Vec::new()).is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
