pub mod client;
pub mod factory;
pub mod openai;
pub mod retrieval;

use async_trait::async_trait;
use mentor_core::types::{Completion, CompletionRequest, RetrievedPassage};
use mentor_core::Result;

/// Chat-completion backend. Implementations own their transport and timeout.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}

/// Reference-passage search backend. Results are ordered by score, highest first.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedPassage>>;
}

pub use factory::{create_provider, create_retriever, infer_provider_from_model};
pub use openai::OpenAIProvider;
pub use retrieval::{CorpusRetriever, HttpRetriever};
