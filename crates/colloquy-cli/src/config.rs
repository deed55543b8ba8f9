use colloquy_llm::config::{ANTHROPIC_API_BASE, ANTHROPIC_API_VERSION};
use colloquy_llm::request::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use colloquy_llm::{AnthropicConfig, GenerationOptions};
use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::args::Args;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub api: ApiConfig,
    pub history: HistoryConfig,
    pub logging: LoggingConfig,

    // Secret (from --api-key / CLAUDE_API_KEY only)
    #[serde(skip)]
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_prompt: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            system_prompt: None,
        }
    }
}

impl From<&LlmConfig> for GenerationOptions {
    fn from(config: &LlmConfig) -> Self {
        GenerationOptions::new(config.model.clone())
            .max_tokens(config.max_tokens)
            .temperature(config.temperature)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub version: String,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: ANTHROPIC_API_BASE.to_string(),
            version: ANTHROPIC_API_VERSION.to_string(),
            connect_timeout_secs: Some(10),
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML, environment variables and flags
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. built-in defaults
    /// 2. `--config <file>`, or ./colloquy.toml if present
    /// 3. Environment variables (`COLLOQUY_LLM__MODEL`, `COLLOQUY_LOGGING__LEVEL`, ...)
    /// 4. Command-line flags
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => File::from(path.as_path()),
            None => File::with_name("colloquy").required(false),
        };

        let config = ConfigLoader::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("COLLOQUY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: Config = config.try_deserialize()?;
        cfg.apply_args(args);

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Command-line flags override every other source
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(model) = &args.model {
            self.llm.model = model.clone();
        }
        if let Some(max_tokens) = args.max_tokens {
            self.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = args.temperature {
            self.llm.temperature = temperature;
        }
        if let Some(system) = &args.system {
            self.llm.system_prompt = Some(system.clone());
        }
        if let Some(path) = &args.history {
            self.history.path = Some(path.clone());
        }
        if let Some(api_key) = &args.api_key {
            self.api_key = api_key.trim().to_string();
        }
    }

    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions::from(&self.llm)
    }

    pub fn anthropic_config(&self) -> AnthropicConfig {
        let mut config = AnthropicConfig::new(self.api_key.clone())
            .with_base_url(self.api.base_url.clone())
            .with_api_version(self.api.version.clone());
        if let Some(secs) = self.api.connect_timeout_secs {
            config = config.with_connect_timeout(secs);
        }
        if let Some(secs) = self.api.request_timeout_secs {
            config = config.with_request_timeout(secs);
        }
        config
    }
}
