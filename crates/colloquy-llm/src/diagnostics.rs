use serde_json::Value;

use crate::error::ChatError;

/// Sink for anomalies that components report but do not propagate
///
/// Every method defaults to a no-op, so a sink only overrides what it cares
/// about. Components take the sink as `Arc<dyn Diagnostics>`.
pub trait Diagnostics: Send + Sync {
    /// Non-success response from the remote endpoint
    fn remote_error(&self, _status: u16, _body: &str) {}

    /// A `data:` payload that could not be parsed and was dropped
    fn frame_skipped(&self, _payload: &str, _reason: &str) {}

    /// A frame whose `type` is not one of the typed shapes
    fn unknown_frame(&self, _raw: &Value) {}

    /// An exchange that ended in the failed state
    fn exchange_failed(&self, _error: &ChatError) {}
}

/// Forwards every report to `tracing`
///
/// Failures that end an exchange are returned to the caller as well, so they
/// are logged at `debug` only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn remote_error(&self, status: u16, body: &str) {
        tracing::debug!(status, body, "Remote service returned an error");
    }

    fn frame_skipped(&self, payload: &str, reason: &str) {
        tracing::debug!(payload, reason, "Skipping malformed stream frame");
    }

    fn unknown_frame(&self, raw: &Value) {
        let frame_type = raw.get("type").and_then(Value::as_str).unwrap_or("<untyped>");
        // Anthropic reports mid-stream failures as `error` frames
        if frame_type == "error" {
            tracing::warn!(frame = %raw, "Stream carried an error frame");
        } else {
            tracing::trace!(frame_type, "Unrecognized stream frame");
        }
    }

    fn exchange_failed(&self, error: &ChatError) {
        tracing::debug!(error = %error, "Exchange failed");
    }
}
