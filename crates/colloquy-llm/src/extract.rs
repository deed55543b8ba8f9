use futures::{stream, StreamExt};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::buffer_utils::LineStream;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::streaming::{decode_stream, BlockKind, ContentBlock, StreamFrame};
use crate::traits::FragmentStream;

/// A piece of generated text, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment(String);

impl Fragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fragment {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Text fragments carried by one frame
///
/// Typed frames are read through their fields. `Unknown` frames fall back to
/// probing the raw value for `delta.text` or a `delta.content` block list,
/// which keeps minor schema drift from losing text.
pub fn extract_fragments(frame: &StreamFrame) -> Vec<Fragment> {
    match frame {
        StreamFrame::ContentDelta { text } => non_empty(text.as_deref()).into_iter().collect(),
        StreamFrame::MessageDelta { content_blocks } => content_blocks
            .iter()
            .flatten()
            .filter_map(text_of_block)
            .collect(),
        StreamFrame::Unknown { raw } => extract_structural(raw),
    }
}

/// Decode a line stream and flatten every frame into its fragments
///
/// Transport errors from `lines` are passed through in order.
pub fn fragments_from_lines(lines: LineStream, diagnostics: Arc<dyn Diagnostics>) -> FragmentStream {
    let frames = decode_stream(lines, diagnostics);

    Box::pin(frames.flat_map(|frame_result| {
        let items: Vec<Result<Fragment>> = match frame_result {
            Ok(frame) => extract_fragments(&frame).into_iter().map(Ok).collect(),
            Err(e) => vec![Err(e)],
        };
        stream::iter(items)
    }))
}

fn text_of_block(block: &ContentBlock) -> Option<Fragment> {
    match block.kind {
        BlockKind::Text => non_empty(block.text.as_deref()),
        BlockKind::Other => None,
    }
}

fn extract_structural(raw: &Value) -> Vec<Fragment> {
    if let Some(text) = raw.pointer("/delta/text").and_then(Value::as_str) {
        return non_empty(Some(text)).into_iter().collect();
    }

    match raw.pointer("/delta/content").and_then(Value::as_array) {
        Some(blocks) => blocks
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|block| non_empty(block.get("text").and_then(Value::as_str)))
            .collect(),
        None => Vec::new(),
    }
}

fn non_empty(text: Option<&str>) -> Option<Fragment> {
    text.filter(|t| !t.is_empty()).map(Fragment::new)
}
