use anyhow::Context;
use clap::Parser;

use colloquy_cli::{
    args::Args, config::Config, history::HistoryStore, logging::init_logging, shell::Shell,
};
use colloquy_llm::{AnthropicClient, Session, Transcript};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file before reading CLAUDE_API_KEY
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = Config::load(&args)
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config.logging);

    if config.api_key.is_empty() {
        anyhow::bail!("Claude API key not provided. Use --api-key or set CLAUDE_API_KEY environment variable.");
    }

    tracing::info!(model = %config.llm.model, "Starting Colloquy");

    let client = AnthropicClient::from_config(config.anthropic_config())
        .context("Failed to create Anthropic client")?;

    let history = config.history.path.clone().map(HistoryStore::new);
    let mut transcript = match &history {
        Some(store) => store.load()?.unwrap_or_default(),
        None => Transcript::new(),
    };
    if let Some(prompt) = &config.llm.system_prompt {
        if transcript.system_prompt().is_none() {
            transcript.set_system_prompt(prompt.clone());
        }
    }

    let session = Session::new(client, config.generation_options())
        .context("Invalid generation settings")?
        .with_transcript(transcript);

    let mut shell = Shell::new(session).with_system_prompt(config.llm.system_prompt.clone());
    if let Some(store) = history {
        shell = shell.with_history(store);
    }

    shell.run().await
}
