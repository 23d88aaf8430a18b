use anyhow::{anyhow, Context};
use mentor_core::config::{AgentSettings, ProviderConfig, RetrievalBackend};
use mentor_core::{Config, Paths};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::client::ProxySettings;
use crate::{CorpusRetriever, HttpRetriever, OpenAIProvider, Provider, Retriever};

fn default_api_base(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "openai" => Some("https://api.openai.com/v1"),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "deepseek" => Some("https://api.deepseek.com/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        _ => None,
    }
}

/// Guesses the provider entry from a model id. `None` means the id carries
/// no recognizable prefix.
pub fn infer_provider_from_model(model: &str) -> Option<&'static str> {
    if model.starts_with("gpt-")
        || model.starts_with("openai/")
        || model.starts_with("o1")
        || model.starts_with("o3")
    {
        Some("openai")
    } else if model.starts_with("deepseek") {
        Some("deepseek")
    } else if model.starts_with("groq/") {
        Some("groq")
    } else if model.contains('/') {
        Some("openrouter")
    } else {
        None
    }
}

fn has_key(cfg: &ProviderConfig) -> bool {
    !cfg.api_key.trim().is_empty()
}

fn first_keyed_provider(config: &Config) -> Option<&str> {
    ["openai", "openrouter", "deepseek", "groq"]
        .into_iter()
        .find(|name| config.get_provider(name).map(has_key).unwrap_or(false))
}

/// Resolves the provider for one agent's settings.
///
/// Order: the explicit `provider` field, then the model prefix, then the
/// first provider entry that has an API key.
pub fn create_provider(config: &Config, settings: &AgentSettings) -> anyhow::Result<Arc<dyn Provider>> {
    let explicit = settings.provider.as_deref();
    let name = explicit
        .or_else(|| infer_provider_from_model(&settings.model))
        .or_else(|| first_keyed_provider(config))
        .ok_or_else(|| {
            anyhow!(
                "No LLM provider configured for model '{}'. Set OPENAI_API_KEY or add a key under providers.",
                settings.model
            )
        })?;

    let provider_cfg = config
        .get_provider(name)
        .ok_or_else(|| anyhow!("Provider '{}' is not defined in the providers section", name))?;

    if !has_key(provider_cfg) {
        return Err(anyhow!(
            "Provider '{}' has no API key (set providers.{}.apiKey{})",
            name,
            name,
            if name == "openai" { " or OPENAI_API_KEY" } else { "" }
        ));
    }

    let api_base = provider_cfg
        .api_base
        .as_deref()
        .or_else(|| default_api_base(name))
        .ok_or_else(|| anyhow!("Provider '{}' needs an apiBase", name))?;

    let proxy = ProxySettings {
        endpoint_proxy: provider_cfg.proxy.as_deref(),
        global_proxy: config.network.proxy.as_deref(),
        no_proxy: &config.network.no_proxy,
    };

    Ok(Arc::new(OpenAIProvider::new_with_proxy(
        &provider_cfg.api_key,
        Some(api_base),
        Duration::from_secs(config.request_timeout_secs),
        proxy,
    )))
}

/// Builds the configured retrieval backend, or `None` when retrieval is off.
pub fn create_retriever(config: &Config, paths: &Paths) -> anyhow::Result<Option<Arc<dyn Retriever>>> {
    let rag = &config.rag;
    match rag.backend {
        RetrievalBackend::None => Ok(None),
        RetrievalBackend::Http => {
            let endpoint = rag
                .endpoint
                .as_deref()
                .filter(|e| !e.trim().is_empty())
                .ok_or_else(|| anyhow!("rag.backend is \"http\" but rag.endpoint is not set"))?;
            let proxy = ProxySettings {
                endpoint_proxy: None,
                global_proxy: config.network.proxy.as_deref(),
                no_proxy: &config.network.no_proxy,
            };
            Ok(Some(Arc::new(HttpRetriever::new(
                endpoint,
                rag.api_key.as_deref(),
                Duration::from_secs(rag.timeout_secs),
                proxy,
            ))))
        }
        RetrievalBackend::Corpus => {
            let path = rag
                .corpus_path
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(|| paths.corpus_file());
            let corpus = CorpusRetriever::load(&path)
                .with_context(|| format!("Failed to load passage corpus from {}", path.display()))?;
            if corpus.is_empty() {
                warn!(path = %path.display(), "Passage corpus is empty, answers will carry no references");
            }
            Ok(Some(Arc::new(corpus)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed_config() -> Config {
        let mut config = Config::default();
        if let Some(p) = config.providers.get_mut("openai") {
            p.api_key = "sk-test".to_string();
        }
        config
    }

    #[test]
    fn test_infer_provider_from_model() {
        assert_eq!(infer_provider_from_model("gpt-4-turbo-preview"), Some("openai"));
        assert_eq!(infer_provider_from_model("gpt-3.5-turbo"), Some("openai"));
        assert_eq!(infer_provider_from_model("deepseek-chat"), Some("deepseek"));
        assert_eq!(infer_provider_from_model("anthropic/claude-3.5-sonnet"), Some("openrouter"));
        assert_eq!(infer_provider_from_model("local-model"), None);
    }

    #[test]
    fn test_create_provider_with_key() {
        let config = keyed_config();
        assert!(create_provider(&config, &config.agents.tax_specialist).is_ok());
    }

    #[test]
    fn test_create_provider_without_key_fails() {
        let config = Config::default();
        let err = create_provider(&config, &config.agents.orchestrator).err().unwrap();
        assert!(err.to_string().contains("no API key"));
    }

    #[test]
    fn test_unknown_model_falls_back_to_keyed_provider() {
        let config = keyed_config();
        let mut settings = config.agents.orchestrator.clone();
        settings.model = "local-model".to_string();
        assert!(create_provider(&config, &settings).is_ok());
    }

    #[test]
    fn test_explicit_provider_missing_fails() {
        let config = keyed_config();
        let mut settings = config.agents.orchestrator.clone();
        settings.provider = Some("azure".to_string());
        assert!(create_provider(&config, &settings).is_err());
    }

    #[test]
    fn test_retriever_disabled_by_default() {
        let config = Config::default();
        let paths = Paths::with_base(std::env::temp_dir().join("test_mentor_factory_none"));
        assert!(create_retriever(&config, &paths).unwrap().is_none());
    }

    #[test]
    fn test_http_retriever_requires_endpoint() {
        let mut config = Config::default();
        config.rag.backend = RetrievalBackend::Http;
        let paths = Paths::with_base(std::env::temp_dir().join("test_mentor_factory_http"));
        assert!(create_retriever(&config, &paths).is_err());

        config.rag.endpoint = Some("http://localhost:8100".to_string());
        assert!(create_retriever(&config, &paths).unwrap().is_some());
    }

    #[test]
    fn test_corpus_retriever_missing_file_fails() {
        let mut config = Config::default();
        config.rag.backend = RetrievalBackend::Corpus;
        let paths = Paths::with_base(std::env::temp_dir().join("test_mentor_factory_missing"));
        assert!(create_retriever(&config, &paths).is_err());
    }

    #[test]
    fn test_empty_corpus_still_loads() {
        let dir = std::env::temp_dir().join("test_mentor_factory_empty_corpus");
        let _ = std::fs::remove_dir_all(&dir);
        let paths = Paths::with_base(dir.clone());
        std::fs::create_dir_all(paths.data_dir()).unwrap();
        std::fs::write(paths.corpus_file(), "\n").unwrap();

        let mut config = Config::default();
        config.rag.backend = RetrievalBackend::Corpus;
        assert!(create_retriever(&config, &paths).unwrap().is_some());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
