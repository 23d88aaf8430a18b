use mentor_core::{Config, Paths};
use std::io::{self, Write};

pub async fn run(force: bool) -> anyhow::Result<()> {
    let paths = Paths::new();

    if paths.config_file().exists() && !force {
        print!("Config already exists. Overwrite? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    Config::default().save(&paths.config_file())?;
    println!("✓ Created config: {}", paths.config_file().display());

    std::fs::create_dir_all(paths.data_dir())?;
    println!("✓ Created data dir: {}", paths.data_dir().display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Edit {} to add an API key (or export OPENAI_API_KEY)",
        paths.config_file().display()
    );
    println!(
        "  2. Optionally set rag.backend to \"corpus\" and place passages in {}",
        paths.corpus_file().display()
    );
    println!("  3. Run `ea-mentor status` to verify configuration");
    println!("  4. Run `ea-mentor ask \"What is basis in a partnership?\"`");

    Ok(())
}
