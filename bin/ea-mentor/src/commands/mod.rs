pub mod ask;
pub mod gateway;
pub mod onboard;
pub mod question;
pub mod route;
pub mod status;

use mentor_agent::MentorRuntime;
use mentor_core::{Config, Paths};
use mentor_providers::{create_provider, create_retriever};
use std::sync::Arc;

pub fn load_config(paths: &Paths) -> anyhow::Result<Config> {
    Ok(Config::load_or_default(paths)?)
}

/// Builds providers, the retriever and both agents from config.
pub fn build_runtime(config: &Config, paths: &Paths) -> anyhow::Result<Arc<MentorRuntime>> {
    let orchestrator_provider = create_provider(config, &config.agents.orchestrator)?;
    let specialist_provider = create_provider(config, &config.agents.tax_specialist)?;
    let retriever = create_retriever(config, paths)?;
    Ok(Arc::new(MentorRuntime::from_config(
        config,
        orchestrator_provider,
        specialist_provider,
        retriever,
    )))
}
