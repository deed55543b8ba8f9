// Anthropic Messages API backend

use crate::buffer_utils::lines_from_bytes;
use crate::config::AnthropicConfig;
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::{ChatError, Result};
use crate::extract::fragments_from_lines;
use crate::request::GenerationRequest;
use crate::traits::{ChatBackend, FragmentStream};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::sync::Arc;

/// Anthropic client (HTTP direct, no SDK)
pub struct AnthropicClient {
    http_client: reqwest::Client,
    messages_url: String,
    diagnostics: Arc<dyn Diagnostics>,
}

impl AnthropicClient {
    /// Create new client with API key and default endpoint
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::from_config(AnthropicConfig::new(api_key))
    }

    pub fn from_config(config: AnthropicConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut api_key = header_value(&config.api_key, "API key")?;
        api_key.set_sensitive(true);
        headers.insert("x-api-key", api_key);
        headers.insert(
            "anthropic-version",
            header_value(&config.api_version, "API version")?,
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        Ok(Self {
            http_client,
            messages_url: config.messages_url(),
            diagnostics: Arc::new(TracingDiagnostics),
        })
    }

    /// Report decode anomalies to `diagnostics` instead of `tracing`
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }
}

fn header_value(value: &str, what: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value.trim())
        .map_err(|_| ChatError::InvalidConfig(format!("{} is not a valid header value", what)))
}

#[async_trait]
impl ChatBackend for AnthropicClient {
    async fn stream_reply(&self, request: &GenerationRequest) -> Result<FragmentStream> {
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending streaming request"
        );

        let response = self
            .http_client
            .post(&self.messages_url)
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::TransportInterrupted(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(status.as_u16(), response.text().await);
            return Err(ChatError::RemoteError {
                status: status.as_u16(),
                body,
            });
        }

        let lines = lines_from_bytes(response.bytes_stream());
        Ok(fragments_from_lines(lines, Arc::clone(&self.diagnostics)))
    }
}

// A body that cannot be read still yields a `RemoteError`, carrying the read
// failure in place of the text.
fn error_body<E: std::fmt::Display>(status: u16, body: std::result::Result<String, E>) -> String {
    match body {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(status, error = %e, "Failed to read error response body");
            format!("<unreadable response body: {}>", e)
        }
    }
}
