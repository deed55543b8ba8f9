use std::fmt::Display;
use std::pin::Pin;

use futures::{Stream, StreamExt};

use super::buffering::{LineBuffer, DEFAULT_MAX_LINE_LEN};
use crate::error::{ChatError, Result};

pub type LineStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Split a chunked response body into lines
///
/// A chunk error, or a line longer than [`DEFAULT_MAX_LINE_LEN`], ends the
/// stream with `TransportInterrupted`. An unterminated
/// final line is still delivered when the body ends cleanly.
pub fn lines_from_bytes<S, B, E>(byte_stream: S) -> LineStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(byte_stream);
        let mut buffer = LineBuffer::default();

        while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    buffer.extend(bytes.as_ref());

                    while let Some(line) = buffer.next_line() {
                        yield Ok(line);
                    }

                    if buffer.is_overflowing() {
                        yield Err(ChatError::TransportInterrupted(format!(
                            "line exceeds {} bytes without a newline",
                            DEFAULT_MAX_LINE_LEN
                        )));
                        return;
                    }
                }
                Err(e) => {
                    yield Err(ChatError::TransportInterrupted(e.to_string()));
                    return;
                }
            }
        }

        if let Some(line) = buffer.finish() {
            yield Ok(line);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_lines_across_chunks() {
        let chunks: Vec<std::result::Result<&'static [u8], String>> = vec![
            Ok(b"data: {\"a\"".as_slice()),
            Ok(b":1}\n\ndata: [DO".as_slice()),
            Ok(b"NE]".as_slice()),
        ];

        let lines: Vec<String> = lines_from_bytes(stream::iter(chunks))
            .map(|line| line.unwrap())
            .collect()
            .await;

        assert_eq!(lines, ["data: {\"a\":1}", "", "data: [DONE]"]);
    }

    #[tokio::test]
    async fn test_chunk_error_interrupts() {
        let chunks: Vec<std::result::Result<&'static [u8], String>> = vec![
            Ok(b"data: one\n".as_slice()),
            Err("connection reset".to_string()),
            Ok(b"data: never\n".as_slice()),
        ];

        let items: Vec<Result<String>> = lines_from_bytes(stream::iter(chunks)).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "data: one");
        assert!(matches!(items[1], Err(ChatError::TransportInterrupted(_))));
    }

    #[tokio::test]
    async fn test_unbounded_line_interrupts() {
        let chunk = vec![b'x'; DEFAULT_MAX_LINE_LEN / 2 + 1];
        let chunks: Vec<std::result::Result<Vec<u8>, String>> =
            vec![Ok(chunk.clone()), Ok(chunk.clone()), Ok(chunk)];

        let items: Vec<Result<String>> = lines_from_bytes(stream::iter(chunks)).collect().await;

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(ChatError::TransportInterrupted(_))));
    }
}
