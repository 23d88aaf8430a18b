use anyhow::Context;
use mentor_core::{ChatRequest, Paths, UserContext};

use super::{build_runtime, load_config};

pub async fn run(message: &str, context_json: Option<&str>, json: bool) -> anyhow::Result<()> {
    let paths = Paths::new();
    let config = load_config(&paths)?;
    let runtime = build_runtime(&config, &paths)?;

    let mut request = ChatRequest::new(message);
    if let Some(raw) = context_json {
        let ctx: UserContext = serde_json::from_str(raw).context("--context must be a JSON object")?;
        request = request.with_context(ctx);
    }

    let reply = runtime.chat(&request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
        return Ok(());
    }

    println!(
        "[{} via {:?}, confidence {:.2}]",
        reply.routing.agent, reply.routing.routing_method, reply.routing.confidence
    );
    println!();
    println!("{}", reply.response);

    if !reply.citations.is_empty() {
        println!();
        println!("Sources:");
        for c in &reply.citations {
            let page = c.page.map(|p| format!(", page {}", p)).unwrap_or_default();
            println!("  - {}{} (relevance {:.2})", c.source, page, c.relevance_score);
        }
    }

    println!();
    println!(
        "tokens: {}  cost: ${:.4}  latency: {} ms{}",
        reply.metadata.tokens_used,
        reply.metadata.cost,
        reply.metadata.latency_ms,
        if reply.metadata.multi_agent { "  (multi-intent)" } else { "" }
    );
    Ok(())
}
