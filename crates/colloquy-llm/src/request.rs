use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};
use crate::transcript::Transcript;
use crate::types::WireMessage;

pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";
pub const DEFAULT_MAX_TOKENS: u32 = 5000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Request body sent to the generation endpoint
///
/// Derived from a transcript snapshot, never stored. Field names match the
/// outbound JSON exactly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub stream: bool,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Build a streaming request from the current transcript
pub fn build(
    transcript: &Transcript,
    model_id: &str,
    max_tokens: u32,
    temperature: f32,
) -> Result<GenerationRequest> {
    if transcript.is_empty() {
        return Err(ChatError::EmptyTranscript);
    }

    Ok(GenerationRequest {
        model: model_id.to_string(),
        messages: transcript.to_wire_format(),
        stream: true,
        max_tokens,
        temperature,
    })
}

/// Per-session generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl GenerationOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = temp;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(ChatError::InvalidConfig("model id must not be empty".into()));
        }
        if self.max_tokens == 0 {
            return Err(ChatError::InvalidConfig("max_tokens must be positive".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ChatError::InvalidConfig(format!(
                "temperature {} is outside [0, 2]",
                self.temperature
            )));
        }
        Ok(())
    }

    /// Build a request for `transcript` using these options
    pub fn build_request(&self, transcript: &Transcript) -> Result<GenerationRequest> {
        build(transcript, &self.model, self.max_tokens, self.temperature)
    }
}
