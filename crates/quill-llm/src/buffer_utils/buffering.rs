use crate::error::{ChatError, Result, StreamFailure};
use std::collections::VecDeque;

/// Circular buffer for line-based parsing of a chunked byte stream.
/// Chunks may split lines (and UTF-8 sequences) anywhere; a line is only
/// decoded once its terminator has arrived.
pub struct CircularLineBuffer {
    buffer: VecDeque<u8>,
}

impl CircularLineBuffer {
    /// Create a new buffer with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    /// Add bytes to the buffer
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Extract next line (up to \n) from buffer, without its `\n` or `\r\n`.
    /// Returns None if no complete line is available
    pub fn next_line(&mut self) -> Option<Result<String>> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        Some(decode_line(line_bytes))
    }

    /// Drain whatever is left once the source has ended
    pub fn take_remaining(&mut self) -> Option<Result<String>> {
        if self.buffer.is_empty() {
            return None;
        }
        let line_bytes: Vec<u8> = self.buffer.drain(..).collect();
        Some(decode_line(line_bytes))
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

fn decode_line(mut bytes: Vec<u8>) -> Result<String> {
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    String::from_utf8(bytes).map_err(|e| ChatError::Stream(StreamFailure::invalid_utf8(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_buffer_basic() {
        let mut buffer = CircularLineBuffer::with_capacity(64);

        buffer.extend(b"line1\nline2\r\n");

        assert_eq!(buffer.next_line().unwrap().unwrap(), "line1");
        assert_eq!(buffer.next_line().unwrap().unwrap(), "line2");
        assert!(buffer.next_line().is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_partial_line() {
        let mut buffer = CircularLineBuffer::with_capacity(64);

        buffer.extend(b"partial");
        assert!(buffer.next_line().is_none());
        assert_eq!(buffer.len(), 7);

        buffer.extend(b" line\n");
        assert_eq!(buffer.next_line().unwrap().unwrap(), "partial line");
    }

    #[test]
    fn test_split_utf8_sequence() {
        let mut buffer = CircularLineBuffer::with_capacity(64);
        let text = "café\n".as_bytes();

        buffer.extend(&text[..4]);
        assert!(buffer.next_line().is_none());

        buffer.extend(&text[4..]);
        assert_eq!(buffer.next_line().unwrap().unwrap(), "café");
    }

    #[test]
    fn test_take_remaining() {
        let mut buffer = CircularLineBuffer::with_capacity(64);

        buffer.extend(b"data: tail");
        assert_eq!(buffer.take_remaining().unwrap().unwrap(), "data: tail");
        assert!(buffer.take_remaining().is_none());
    }

    #[test]
    fn test_invalid_utf8() {
        let mut buffer = CircularLineBuffer::with_capacity(64);

        buffer.extend(&[0xff, 0xfe, b'\n']);
        assert!(matches!(buffer.next_line(), Some(Err(ChatError::Stream(_)))));
    }
}
