use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::time::Duration;

use super::buffering::CircularLineBuffer;
use crate::error::{ChatError, StreamFailure};
use crate::traits::SseStream;

/// Payload the server sends once it has no more deltas
pub const DONE_MARKER: &str = "[DONE]";

/// One dispatched server-sent event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    /// Value of the `event:` field, if the server named the event
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
}

impl SseFrame {
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
        }
    }

    pub fn named(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: data.into(),
        }
    }

    /// Server-side error event
    pub fn is_error(&self) -> bool {
        self.event.as_deref() == Some("error")
    }

    /// Check the raw payload for the terminator, before any JSON parsing
    pub fn is_done_marker(&self) -> bool {
        self.data.trim() == DONE_MARKER
    }
}

/// Collects field lines until a blank line dispatches the frame
#[derive(Debug, Default)]
struct FrameBuilder {
    event: Option<String>,
    data: Vec<String>,
}

impl FrameBuilder {
    fn push_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            // id / retry carry nothing we act on
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        Some(SseFrame {
            event,
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

/// Decode a chunked response body into SSE frames.
///
/// Read errors and invalid UTF-8 end the stream with `ChatError::Stream`.
/// With `idle_timeout` set, a gap between chunks longer than the window does too.
pub fn parse_sse_stream<S, B, E>(bytes: S, idle_timeout: Option<Duration>) -> SseStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(bytes);
        let mut buffer = CircularLineBuffer::with_capacity(4096);
        let mut frame = FrameBuilder::default();

        loop {
            let next = match idle_timeout {
                Some(window) => match tokio::time::timeout(window, byte_chunks.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        yield Err(ChatError::Stream(StreamFailure::idle_timeout(window.as_secs())));
                        return;
                    }
                },
                None => byte_chunks.next().await,
            };

            let Some(chunk_result) = next else {
                break;
            };

            match chunk_result {
                Ok(bytes) => {
                    buffer.extend(bytes.as_ref());

                    // Process all complete lines in buffer
                    while let Some(line_result) = buffer.next_line() {
                        match line_result {
                            Ok(line) => {
                                if let Some(ready) = frame.push_line(&line) {
                                    yield Ok(ready);
                                }
                            }
                            Err(e) => {
                                yield Err(e);
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    yield Err(ChatError::Stream(StreamFailure::connection(e)));
                    return;
                }
            }
        }

        // Body ended; an unterminated last frame still counts
        if let Some(line_result) = buffer.take_remaining() {
            match line_result {
                Ok(line) => {
                    if let Some(ready) = frame.push_line(&line) {
                        yield Ok(ready);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
        if let Some(ready) = frame.dispatch() {
            yield Ok(ready);
        }
    })
}
