use mentor_core::config::RetrievalBackend;
use mentor_core::{Config, Paths};

pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new();

    println!("ea-mentor status");
    println!("================");
    println!();

    let config_path = paths.config_file();
    let config_exists = config_path.exists();
    println!(
        "Config:    {} {}",
        config_path.display(),
        if config_exists { "✓" } else { "✗ (not found, using defaults)" }
    );

    let config = Config::load_or_default(&paths)?;

    println!();
    println!("Providers:");
    let mut names: Vec<&String> = config.providers.keys().collect();
    names.sort();
    for name in names {
        let provider = &config.providers[name];
        let status = if provider.api_key.is_empty() { "✗ no key" } else { "✓ configured" };
        println!("  {:<12} {}", name, status);
    }

    println!();
    println!("Agents:");
    let agents = [
        ("orchestrator", &config.agents.orchestrator),
        ("tax_specialist", &config.agents.tax_specialist),
        ("socratic_coach", &config.agents.socratic_coach),
        ("data_analyst", &config.agents.data_analyst),
    ];
    for (name, settings) in agents {
        println!(
            "  {:<15} {} (temperature {}, max_tokens {})",
            name, settings.model, settings.temperature, settings.max_tokens
        );
    }
    println!(
        "  keyword threshold: {}",
        config.agents.keyword_confidence_threshold
    );

    println!();
    let retrieval = match config.rag.backend {
        RetrievalBackend::None => "disabled".to_string(),
        RetrievalBackend::Http => format!(
            "http {}",
            config.rag.endpoint.as_deref().unwrap_or("(endpoint missing)")
        ),
        RetrievalBackend::Corpus => {
            let path = config
                .rag
                .corpus_path
                .clone()
                .unwrap_or_else(|| paths.corpus_file().display().to_string());
            format!("corpus {}", path)
        }
    };
    println!("Retrieval: {} (top_k {})", retrieval, config.rag.top_k);
    println!(
        "Gateway:   {}:{} {}",
        config.gateway.host,
        config.gateway.port,
        if config.api_token().is_some() { "(token required)" } else { "(open)" }
    );

    if !config_exists {
        println!();
        println!("Run `ea-mentor onboard` to write a config file.");
    }

    Ok(())
}
