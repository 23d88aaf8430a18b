use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};
use crate::paths::Paths;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base: Option<String>,
    /// `None` follows the global proxy, `Some("")` forces a direct connection.
    #[serde(default)]
    pub proxy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub no_proxy: Vec<String>,
}

/// Model and sampling defaults for one agent instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Explicit provider name. Inferred from the model id when absent.
    #[serde(default)]
    pub provider: Option<String>,
}

impl AgentSettings {
    fn new(model: &str, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model: model.to_string(),
            temperature,
            max_tokens,
            provider: None,
        }
    }
}

fn default_orchestrator() -> AgentSettings {
    AgentSettings::new("gpt-3.5-turbo", 0.3, 500)
}

fn default_tax_specialist() -> AgentSettings {
    AgentSettings::new("gpt-4-turbo-preview", 0.5, 3000)
}

fn default_socratic_coach() -> AgentSettings {
    AgentSettings::new("gpt-4-turbo-preview", 0.7, 2000)
}

fn default_data_analyst() -> AgentSettings {
    AgentSettings::new("gpt-4-turbo-preview", 0.2, 2500)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentsConfig {
    #[serde(default = "default_orchestrator")]
    pub orchestrator: AgentSettings,
    #[serde(default = "default_tax_specialist")]
    pub tax_specialist: AgentSettings,
    #[serde(default = "default_socratic_coach")]
    pub socratic_coach: AgentSettings,
    #[serde(default = "default_data_analyst")]
    pub data_analyst: AgentSettings,
    /// Keyword confidence strictly above this skips the AI routing pass.
    #[serde(default = "default_keyword_confidence_threshold")]
    pub keyword_confidence_threshold: f64,
}

fn default_keyword_confidence_threshold() -> f64 {
    0.8
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            orchestrator: default_orchestrator(),
            tax_specialist: default_tax_specialist(),
            socratic_coach: default_socratic_coach(),
            data_analyst: default_data_analyst(),
            keyword_confidence_threshold: default_keyword_confidence_threshold(),
        }
    }
}

/// Per-token USD price pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPrice {
    pub input: f64,
    pub output: f64,
}

fn default_high_price() -> TokenPrice {
    TokenPrice { input: 0.00001, output: 0.00003 }
}

fn default_low_price() -> TokenPrice {
    TokenPrice { input: 0.0000005, output: 0.0000015 }
}

fn default_high_tier_markers() -> Vec<String> {
    vec!["gpt-4".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingConfig {
    #[serde(default = "default_high_price")]
    pub high: TokenPrice,
    #[serde(default = "default_low_price")]
    pub low: TokenPrice,
    /// A model id containing any of these substrings is billed at the high tier.
    #[serde(default = "default_high_tier_markers")]
    pub high_tier_markers: Vec<String>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            high: default_high_price(),
            low: default_low_price(),
            high_tier_markers: default_high_tier_markers(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalBackend {
    #[default]
    None,
    Http,
    Corpus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagConfig {
    #[serde(default)]
    pub backend: RetrievalBackend,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Base URL of the search service (http backend).
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// JSON-lines passage file (corpus backend). Defaults to the data dir.
    #[serde(default)]
    pub corpus_path: Option<String>,
    #[serde(default = "default_retrieval_timeout")]
    pub timeout_secs: u64,
}

fn default_top_k() -> usize {
    5
}

fn default_retrieval_timeout() -> u64 {
    15
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            backend: RetrievalBackend::None,
            top_k: default_top_k(),
            endpoint: None,
            api_key: None,
            corpus_path: None,
            timeout_secs: default_retrieval_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_gateway_host() -> String {
    "0.0.0.0".to_string()
}

fn default_gateway_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            api_token: None,
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_request_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Upper bound for a single completion call, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert("openai".to_string(), ProviderConfig {
            api_key: String::new(),
            api_base: Some("https://api.openai.com/v1".to_string()),
            proxy: None,
        });
        providers.insert("openrouter".to_string(), ProviderConfig {
            api_key: String::new(),
            api_base: Some("https://openrouter.ai/api/v1".to_string()),
            proxy: None,
        });

        Self {
            providers,
            network: NetworkConfig::default(),
            agents: AgentsConfig::default(),
            pricing: PricingConfig::default(),
            rag: RagConfig::default(),
            gateway: GatewayConfig::default(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        let mut config = if config_path.exists() {
            Self::load(&config_path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Environment values fill gaps left by the config file; they never
    /// replace an explicitly configured value.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            let key = key.trim().to_string();
            if !key.is_empty() {
                let entry = self.providers.entry("openai".to_string()).or_default();
                if entry.api_key.is_empty() {
                    entry.api_key = key;
                    info!("Using OPENAI_API_KEY from environment");
                }
            }
        }

        let needs_token = self
            .gateway
            .api_token
            .as_deref()
            .map(|t| t.trim().is_empty())
            .unwrap_or(true);
        if needs_token {
            if let Ok(token) = std::env::var("EA_MENTOR_API_TOKEN") {
                if !token.trim().is_empty() {
                    self.gateway.api_token = Some(token.trim().to_string());
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.agents.keyword_confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::Config(format!(
                "agents.keywordConfidenceThreshold must be within [0, 1], got {}",
                threshold
            )));
        }
        if self.rag.top_k == 0 {
            return Err(Error::Config("rag.topK must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    pub fn api_token(&self) -> Option<&str> {
        self.gateway
            .api_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}
