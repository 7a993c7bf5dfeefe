use crate::buffer_utils::SseFrame;
use crate::error::Result;
use crate::types::ModelMessage;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Raw decoded SSE frames of one streaming response
pub type SseStream = Pin<Box<dyn Stream<Item = Result<SseFrame>> + Send>>;

/// Transport for chat completions.
///
/// `chat` performs one buffered request/response cycle and returns the text of
/// the first choice. `chat_stream` opens an event-stream response and hands back
/// its frames undecoded; turning them into text is the job of
/// [`crate::streaming::accumulate`].
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Non-streaming chat completion
    async fn chat(&self, request: ChatRequest) -> Result<String>;

    /// Streaming chat completion
    async fn chat_stream(&self, request: ChatRequest) -> Result<SseStream>;
}

#[async_trait]
impl<T: ChatClient + ?Sized> ChatClient for std::sync::Arc<T> {
    async fn chat(&self, request: ChatRequest) -> Result<String> {
        (**self).chat(request).await
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<SseStream> {
        (**self).chat_stream(request).await
    }
}

/// Per-request parameters supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl RequestParams {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 1.0,
            max_tokens: 1024,
            system_prompt: None,
        }
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = temp;
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Pair these parameters with an assembled message list
    pub fn to_request(&self, messages: Vec<ModelMessage>) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ModelMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ModelMessage>) -> Self {
        RequestParams::new(model).to_request(messages)
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = temp;
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }
}

/// How a reply should be delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyMode {
    /// One request, one complete response
    #[default]
    Buffered,
    /// Event-stream response with live partial updates
    Streaming,
}

impl ReplyMode {
    pub fn from_stream_flag(stream: bool) -> Self {
        if stream {
            Self::Streaming
        } else {
            Self::Buffered
        }
    }
}
