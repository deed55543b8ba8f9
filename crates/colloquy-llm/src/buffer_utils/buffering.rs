use std::collections::VecDeque;

/// Longest line accepted before the body is treated as broken
pub const DEFAULT_MAX_LINE_LEN: usize = 1024 * 1024;

/// Byte accumulator that hands out complete lines
///
/// Chunks may split a line (or a multi-byte character) anywhere; the tail is
/// held until its newline arrives. Lines are returned without the trailing
/// `\n` or `\r\n`.
pub struct LineBuffer {
    buffer: VecDeque<u8>,
    // Bytes already searched for a newline
    scanned: usize,
    max_line_len: usize,
}

impl LineBuffer {
    /// Create a new buffer with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            scanned: 0,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }

    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    /// Add bytes to the buffer
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Extract next line (up to \n) from buffer
    /// Returns None if no complete line is available
    pub fn next_line(&mut self) -> Option<String> {
        let Some(offset) = self.buffer.range(self.scanned..).position(|&b| b == b'\n') else {
            self.scanned = self.buffer.len();
            return None;
        };
        let newline_pos = self.scanned + offset;
        let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        self.scanned = 0;
        Some(decode_line(&line_bytes))
    }

    /// Whether the pending partial line has outgrown the limit
    pub fn is_overflowing(&self) -> bool {
        self.buffer.len() > self.max_line_len
    }

    /// Take whatever is left once the body has ended
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        if self.buffer.is_empty() {
            return None;
        }
        let rest: Vec<u8> = self.buffer.drain(..).collect();
        Some(decode_line(&rest))
    }

    /// Current buffer size
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_capacity(4096)
    }
}

// Invalid UTF-8 is replaced rather than rejected; the decoder drops whatever
// then fails to parse as JSON.
fn decode_line(bytes: &[u8]) -> String {
    let line = String::from_utf8_lossy(bytes);
    line.trim_end_matches(['\n', '\r']).to_string()
}
