use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::Result;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// One decoded `data:` line from the response stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// `content_block_delta`
    ContentDelta { text: Option<String> },

    /// `message_delta`
    MessageDelta { content_blocks: Option<Vec<ContentBlock>> },

    /// Any other tag, or a known tag whose body did not validate
    Unknown { raw: Value },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default)]
    pub text: Option<String>,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Text,
            text: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Text,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct DeltaEnvelope<D> {
    delta: Option<D>,
}

#[derive(Debug, Deserialize)]
struct TextDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentListDelta {
    #[serde(default)]
    content: Option<Vec<ContentBlock>>,
}

impl StreamFrame {
    /// Classify a parsed payload by its `type` discriminant
    pub fn classify(value: Value) -> Self {
        let tag = value.get("type").and_then(Value::as_str).map(str::to_owned);

        match tag.as_deref() {
            Some("content_block_delta") => {
                match DeltaEnvelope::<TextDelta>::deserialize(&value) {
                    Ok(envelope) => Self::ContentDelta {
                        text: envelope.delta.and_then(|d| d.text),
                    },
                    Err(_) => Self::Unknown { raw: value },
                }
            }
            Some("message_delta") => {
                match DeltaEnvelope::<ContentListDelta>::deserialize(&value) {
                    Ok(envelope) => Self::MessageDelta {
                        content_blocks: envelope.delta.and_then(|d| d.content),
                    },
                    Err(_) => Self::Unknown { raw: value },
                }
            }
            _ => Self::Unknown { raw: value },
        }
    }
}

/// Line-at-a-time frame decoder
///
/// Blank lines and lines without the `data: ` prefix produce nothing.
/// `data: [DONE]` finishes the decoder; every later line is ignored.
/// Payloads that are not valid JSON are reported to the diagnostics sink
/// and dropped, so one corrupt frame never ends the stream.
pub struct FrameDecoder {
    finished: bool,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(Arc::new(TracingDiagnostics))
    }
}

impl FrameDecoder {
    pub fn new(diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            finished: false,
            diagnostics,
        }
    }

    /// Whether the end-of-stream sentinel has been seen
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn decode_line(&mut self, line: &str) -> Option<StreamFrame> {
        if self.finished || line.trim().is_empty() {
            return None;
        }

        let payload = line.strip_prefix(DATA_PREFIX)?;

        if payload.trim_end() == DONE_SENTINEL {
            self.finished = true;
            return None;
        }

        match serde_json::from_str::<Value>(payload) {
            Ok(value) => {
                let frame = StreamFrame::classify(value);
                if let StreamFrame::Unknown { raw } = &frame {
                    self.diagnostics.unknown_frame(raw);
                }
                Some(frame)
            }
            Err(e) => {
                self.diagnostics.frame_skipped(payload, &e.to_string());
                None
            }
        }
    }

    /// Drive this decoder over an already line-delimited input
    pub fn frames<I>(self, lines: I) -> Frames<I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Frames {
            lines: lines.into_iter(),
            decoder: self,
        }
    }
}

/// Lazy, forward-only frame sequence over a line iterator
pub struct Frames<I> {
    lines: I,
    decoder: FrameDecoder,
}

impl<I> Iterator for Frames<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = StreamFrame;

    fn next(&mut self) -> Option<StreamFrame> {
        while !self.decoder.is_finished() {
            let line = self.lines.next()?;
            if let Some(frame) = self.decoder.decode_line(line.as_ref()) {
                return Some(frame);
            }
        }
        None
    }
}

/// Decode a line iterator using the tracing diagnostics sink
pub fn decode_lines<I>(lines: I) -> Frames<I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    FrameDecoder::default().frames(lines)
}

/// Decode an async line stream
///
/// Transport errors are passed through and end the stream, as does the
/// `[DONE]` sentinel.
pub fn decode_stream<S>(
    lines: S,
    diagnostics: Arc<dyn Diagnostics>,
) -> impl Stream<Item = Result<StreamFrame>> + Send + 'static
where
    S: Stream<Item = Result<String>> + Send + 'static,
{
    async_stream::stream! {
        let mut decoder = FrameDecoder::new(diagnostics);
        let mut lines = Box::pin(lines);

        while let Some(line_result) = lines.next().await {
            match line_result {
                Ok(line) => {
                    if let Some(frame) = decoder.decode_line(&line) {
                        yield Ok(frame);
                    }
                    if decoder.is_finished() {
                        break;
                    }
                }
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    }
}
