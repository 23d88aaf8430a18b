use mentor_core::types::Difficulty;
use mentor_core::{Paths, QuestionRequest};

use super::{build_runtime, load_config};

pub async fn run(topic: &str, difficulty: &str) -> anyhow::Result<()> {
    let difficulty: Difficulty = difficulty.parse()?;

    let paths = Paths::new();
    let config = load_config(&paths)?;
    let runtime = build_runtime(&config, &paths)?;

    let question = runtime
        .generate_question(&QuestionRequest::new(topic, difficulty))
        .await?;

    println!("{}", serde_json::to_string_pretty(&question)?);
    Ok(())
}
