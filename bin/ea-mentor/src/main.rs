mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ea-mentor")]
#[command(about = "Query router and tax specialist for EA exam preparation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Onboard {
        /// Overwrite an existing configuration without asking
        #[arg(long)]
        force: bool,
    },

    /// Show configuration status
    Status,

    /// Start the HTTP gateway
    Gateway {
        /// Port to listen on (overrides config gateway.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config gateway.host)
        #[arg(long)]
        host: Option<String>,
    },

    /// Route a message and print the specialist's answer
    Ask {
        message: String,

        /// User context as JSON, e.g. '{"ready_score": 87, "exam_part": 2}'
        #[arg(long)]
        context: Option<String>,

        /// Print the full reply as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which specialist a message would be routed to
    Route {
        message: String,

        /// Only run the keyword pass (no API key needed)
        #[arg(long)]
        keyword_only: bool,
    },

    /// Generate a practice question for a topic
    Question {
        topic: String,

        /// easy, medium or hard
        #[arg(short, long, default_value = "medium")]
        difficulty: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    match cli.command {
        Commands::Onboard { force } => commands::onboard::run(force).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Gateway { port, host } => commands::gateway::run(host, port).await?,
        Commands::Ask { message, context, json } => {
            commands::ask::run(&message, context.as_deref(), json).await?
        }
        Commands::Route { message, keyword_only } => commands::route::run(&message, keyword_only).await?,
        Commands::Question { topic, difficulty } => commands::question::run(&topic, &difficulty).await?,
    }

    Ok(())
}
