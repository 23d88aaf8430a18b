use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level fault raised by a completion or retrieval adapter.
    #[error("Provider error: {0}")]
    Provider(String),

    /// A specialist's completion call failed. Carries the agent name so the
    /// request boundary can report which stage broke.
    #[error("{agent} agent error: {message}")]
    AgentInvocation { agent: String, message: String },

    /// The model was asked for JSON and returned something else.
    #[error("Structured output parse error: {0}")]
    StructuredParse(String),

    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    pub fn agent_invocation(agent: &str, cause: impl std::fmt::Display) -> Self {
        Error::AgentInvocation {
            agent: agent.to_string(),
            message: cause.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_invocation_display_names_agent() {
        let err = Error::agent_invocation("tax_specialist", Error::Provider("timeout".to_string()));
        assert_eq!(err.to_string(), "tax_specialist agent error: Provider error: timeout");
    }
}
