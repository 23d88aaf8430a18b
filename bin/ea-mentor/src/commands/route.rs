use mentor_agent::{KeywordRouter, Orchestrator, PricingTable};
use mentor_core::Paths;
use mentor_providers::create_provider;

use super::load_config;

pub async fn run(message: &str, keyword_only: bool) -> anyhow::Result<()> {
    let router = KeywordRouter::new();

    let decision = if keyword_only {
        router.route(message)
    } else {
        let paths = Paths::new();
        let config = load_config(&paths)?;
        let provider = create_provider(&config, &config.agents.orchestrator)?;
        let orchestrator = Orchestrator::new(
            &config.agents.orchestrator,
            config.agents.keyword_confidence_threshold,
            provider,
            PricingTable::from_config(&config.pricing),
        );
        orchestrator.route(message, None).await
    };

    println!("{}", serde_json::to_string_pretty(&decision)?);

    let scores = router
        .scores(message)
        .into_iter()
        .map(|(agent, hits)| format!("{}={}", agent, hits))
        .collect::<Vec<_>>()
        .join(" ");
    println!("keyword scores: {}", scores);
    if router.is_multi_intent(message) {
        println!("multi-intent: yes");
    }
    Ok(())
}
