use std::pin::Pin;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::buffer_utils::SseFrame;
use crate::error::{ChatError, Result, StreamFailure};

/// Progress of one streamed reply.
///
/// A successful sequence is zero or more `Partial` events followed by exactly
/// one `Completed`. Errors end the sequence without a `Completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Everything received so far, after a non-empty delta
    Partial {
        text: String,
    },

    /// Final text. `stopped` is true when the caller ended the stream early.
    Completed {
        text: String,
        stopped: bool,
    },
}

/// Lazy, single-consumer sequence of reply events
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatStreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatStreamChunk {
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
    }
}

/// Growing text of one streamed reply
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one data payload and append its delta.
    ///
    /// Returns the full text when the payload carried new content, `None` when
    /// it carried none (role-only deltas, empty choices, empty strings).
    pub fn push_payload(&mut self, payload: &str) -> Result<Option<&str>> {
        let chunk: ChatStreamChunk =
            serde_json::from_str(payload).map_err(|source| ChatError::MalformedEvent {
                payload: payload.to_string(),
                source,
            })?;
        Ok(self.push_delta(chunk.content()))
    }

    pub fn push_delta(&mut self, delta: Option<&str>) -> Option<&str> {
        match delta {
            Some(fragment) if !fragment.is_empty() => {
                self.text.push_str(fragment);
                Some(&self.text)
            }
            _ => None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn take_text(&mut self) -> String {
        std::mem::take(&mut self.text)
    }
}

/// Turn raw SSE frames into reply events.
///
/// `cancel` is checked before every frame is taken, and while waiting for one.
/// Once it fires, the frame source is dropped (closing the connection) and the
/// text accumulated so far is emitted as `Completed { stopped: true }`, even if
/// it is empty. When a frame and the stop are ready together, the stop wins.
///
/// The terminator and the end of the body both complete normally. Error frames,
/// read errors and unparseable payloads end the sequence with an error and the
/// accumulated text is discarded.
pub fn accumulate<S>(frames: S, cancel: CancellationToken) -> ReplyStream
where
    S: Stream<Item = Result<SseFrame>> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut frames = Box::pin(frames);
        let mut accumulator = StreamAccumulator::new();
        let mut delta_count: usize = 0;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                frame = frames.next() => Some(frame),
            };

            let Some(frame) = next else {
                drop(frames);
                info!(deltas = delta_count, chars = accumulator.text().len(), "stream stopped by request");
                yield Ok(StreamEvent::Completed {
                    text: accumulator.take_text(),
                    stopped: true,
                });
                break;
            };

            match frame {
                None => {
                    drop(frames);
                    debug!(deltas = delta_count, "stream body ended without terminator");
                    yield Ok(StreamEvent::Completed {
                        text: accumulator.take_text(),
                        stopped: false,
                    });
                    break;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "stream failed");
                    yield Err(e);
                    break;
                }
                Some(Ok(frame)) if frame.is_error() => {
                    warn!(payload = %frame.data, "server sent error event");
                    yield Err(ChatError::Stream(StreamFailure::error_event(frame.data)));
                    break;
                }
                Some(Ok(frame)) if frame.is_done_marker() => {
                    drop(frames);
                    debug!(deltas = delta_count, chars = accumulator.text().len(), "stream finished");
                    yield Ok(StreamEvent::Completed {
                        text: accumulator.take_text(),
                        stopped: false,
                    });
                    break;
                }
                Some(Ok(frame)) => {
                    let partial = match accumulator.push_payload(&frame.data) {
                        Ok(partial) => partial.map(str::to_string),
                        Err(e) => {
                            warn!(error = %e, "malformed stream event");
                            yield Err(e);
                            break;
                        }
                    };
                    if let Some(text) = partial {
                        delta_count += 1;
                        yield Ok(StreamEvent::Partial { text });
                    }
                }
            }
        }
    })
}
