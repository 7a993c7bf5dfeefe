// OpenAI-compatible chat completions client

use crate::buffer_utils::parse_sse_stream;
use crate::config::ClientConfig;
use crate::error::{ChatError, Result};
use crate::traits::{ChatClient, ChatRequest, SseStream};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Response;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

const ORGANIZATION_HEADER: &str = "openai-organization";
const REFERER_HEADER: &str = "http-referer";
const TITLE_HEADER: &str = "x-title";

/// OpenAI client (HTTP direct, no SDK)
pub struct OpenAIClient {
    http_client: reqwest::Client,
    completions_url: String,
    request_timeout: Option<Duration>,
    stream_idle_timeout: Option<Duration>,
}

impl OpenAIClient {
    /// Create new client with API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::from_config(ClientConfig::new(api_key).with_env_overrides())
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            header_value("Authorization", &format!("Bearer {}", config.api_key))?,
        );
        if let Some(org) = &config.organization {
            headers.insert(
                HeaderName::from_static(ORGANIZATION_HEADER),
                header_value("OpenAI-Organization", org)?,
            );
        }
        if let Some(referer) = &config.referer {
            headers.insert(
                HeaderName::from_static(REFERER_HEADER),
                header_value("HTTP-Referer", referer)?,
            );
        }
        if let Some(title) = &config.title {
            headers.insert(
                HeaderName::from_static(TITLE_HEADER),
                header_value("X-Title", title)?,
            );
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        let http_client = builder.build()?;

        Ok(Self {
            http_client,
            completions_url: config.completions_url(),
            request_timeout: config.request_timeout(),
            stream_idle_timeout: config.stream_idle_timeout(),
        })
    }

    /// Build chat completion request payload
    fn build_chat_request(&self, request: &ChatRequest, stream: bool) -> Value {
        serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "stream": stream,
        })
    }
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|source| ChatError::InvalidHeader { name, source })
}

/// Turn a non-success response into a transport error, logging the body
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    error!(status = status.as_u16(), body = %body, "completion API returned an error");
    Err(ChatError::transport(status, body))
}

// ============================================================================
// TRAIT IMPLEMENTATIONS
// ============================================================================

#[async_trait]
impl ChatClient for OpenAIClient {
    async fn chat(&self, request: ChatRequest) -> Result<String> {
        let payload = self.build_chat_request(&request, false);
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion request"
        );

        let mut builder = self.http_client.post(&self.completions_url).json(&payload);
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        let response = ensure_success(builder.send().await?).await?;

        let body = response.text().await?;
        let raw: OpenAIChatResponse = serde_json::from_str(&body).map_err(ChatError::Decode)?;

        raw.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ChatError::EmptyResponse)
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<SseStream> {
        let payload = self.build_chat_request(&request, true);
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "opening chat completion stream"
        );

        let response = self
            .http_client
            .post(&self.completions_url)
            .header(ACCEPT, "text/event-stream")
            .json(&payload)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        Ok(parse_sse_stream(response.bytes_stream(), self.stream_idle_timeout))
    }
}

// ============================================================================
// OPENAI-SPECIFIC RESPONSE TYPES (for Chat Completions)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct OpenAIChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModelMessage;

    #[test]
    fn test_payload_shape() {
        let client = OpenAIClient::from_config(ClientConfig::new("test-key")).unwrap();
        let request = ChatRequest::new("gpt-4o-mini", vec![ModelMessage::user("Hi")])
            .temperature(0.2)
            .max_tokens(64);

        let payload = client.build_chat_request(&request, true);

        assert_eq!(payload["model"], "gpt-4o-mini");
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(payload["messages"][0]["content"], "Hi");
        assert_eq!(payload["max_tokens"], 64);
        assert_eq!(payload["stream"], true);
        assert!((payload["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_header_value() {
        let result = OpenAIClient::from_config(ClientConfig::new("bad\nkey"));

        match result {
            Err(ChatError::InvalidHeader { name, .. }) => assert_eq!(name, "Authorization"),
            _ => panic!("Expected InvalidHeader"),
        }
    }
}
