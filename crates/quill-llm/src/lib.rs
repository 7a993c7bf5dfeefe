pub mod assembler;
pub mod buffer_utils;
pub mod config;
pub mod error;
pub mod openai;
pub mod session;
pub mod streaming;
pub mod traits;
pub mod types;

pub use assembler::{assemble_messages, DEFAULT_SYSTEM_PROMPT};
pub use buffer_utils::{parse_sse_stream, SseFrame, DONE_MARKER};
pub use config::ClientConfig;
pub use error::{ChatError, ErrorReason, Result, StreamFailure, StreamFailureReason};
pub use openai::OpenAIClient;
pub use session::{ChatHost, ChatSession};
pub use streaming::{accumulate, ReplyStream, StreamAccumulator, StreamEvent};
pub use traits::{ChatClient, ChatRequest, ReplyMode, RequestParams, SseStream};
pub use types::{ChatMessage, ModelMessage, Role, Sender};

pub use tokio_util::sync::CancellationToken;
