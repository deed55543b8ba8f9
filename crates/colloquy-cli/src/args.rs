use clap::Parser;
use std::path::PathBuf;

/// Streaming chat with Claude from the terminal
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "colloquy", version, about)]
pub struct Args {
    /// Claude API key
    #[arg(long, env = "CLAUDE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model to use (default: claude-3-5-haiku-20241022)
    #[arg(long)]
    pub model: Option<String>,

    /// Maximum tokens in a response
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature, 0 to 2
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Path to conversation history file
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// System prompt to set context
    #[arg(long)]
    pub system: Option<String>,

    /// TOML config file (default: ./colloquy.toml if present)
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}
