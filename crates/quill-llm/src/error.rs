use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Reason code derived from a non-success HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorReason {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    Server,
    Other,
}

impl ErrorReason {
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            500..=599 => Self::Server,
            _ => Self::Other,
        }
    }
}

/// What went wrong on an open event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFailureReason {
    /// The server sent an `event: error` frame
    ErrorEvent,
    /// Reading the response body failed
    Connection,
    /// No frame arrived within the configured idle window
    IdleTimeout,
    /// The body was not valid UTF-8
    InvalidUtf8,
}

/// Stream-level failure, decoded once where the stream is read.
///
/// `payload` keeps the raw text the server (or the transport) produced;
/// `message` is filled when that payload is the API's JSON error envelope.
#[derive(Debug, Clone)]
pub struct StreamFailure {
    pub reason: StreamFailureReason,
    pub message: Option<String>,
    pub payload: String,
}

impl StreamFailure {
    pub fn error_event(payload: impl Into<String>) -> Self {
        let payload = payload.into();
        Self {
            reason: StreamFailureReason::ErrorEvent,
            message: api_error_message(&payload),
            payload,
        }
    }

    pub fn connection(err: impl fmt::Display) -> Self {
        Self {
            reason: StreamFailureReason::Connection,
            message: None,
            payload: err.to_string(),
        }
    }

    pub fn idle_timeout(window_secs: u64) -> Self {
        Self {
            reason: StreamFailureReason::IdleTimeout,
            message: None,
            payload: format!("no event received for {}s", window_secs),
        }
    }

    pub fn invalid_utf8(err: impl fmt::Display) -> Self {
        Self {
            reason: StreamFailureReason::InvalidUtf8,
            message: None,
            payload: err.to_string(),
        }
    }
}

impl fmt::Display for StreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let detail = self.message.as_deref().unwrap_or(&self.payload);
        write!(f, "{:?}: {}", self.reason, detail)
    }
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("API error ({status}): {}", detail(.message, .body))]
    Transport {
        status: StatusCode,
        reason: ErrorReason,
        message: Option<String>,
        body: String,
    },

    #[error("Stream error: {0}")]
    Stream(StreamFailure),

    #[error("Failed to parse stream event: {source}")]
    MalformedEvent {
        payload: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to send request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Response contained no message content")]
    EmptyResponse,

    #[error("Invalid value for header {name}")]
    InvalidHeader {
        name: &'static str,
        #[source]
        source: reqwest::header::InvalidHeaderValue,
    },

    #[error("A request is already in flight on this session")]
    Busy,
}

pub type Result<T> = std::result::Result<T, ChatError>;

impl ChatError {
    /// Decode a non-success response into a transport error
    pub fn transport(status: StatusCode, body: impl Into<String>) -> Self {
        let body = body.into();
        Self::Transport {
            status,
            reason: ErrorReason::from_status(status),
            message: api_error_message(&body),
            body,
        }
    }

    /// HTTP status for transport errors
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Transport { status, .. } => Some(*status),
            Self::Request(e) => e.status(),
            _ => None,
        }
    }

    /// Short text suitable for a user-facing notice.
    /// Full detail (raw bodies, payloads) belongs in the log, not here.
    pub fn user_notice(&self) -> String {
        match self {
            Self::Transport { status, .. } => {
                format!("Error from the completion API: {}", status.as_u16())
            }
            Self::Stream(failure) => match failure.reason {
                StreamFailureReason::IdleTimeout => {
                    "The streamed reply stopped responding".to_string()
                }
                _ => "The streamed reply failed".to_string(),
            },
            Self::MalformedEvent { .. } => "Received an unreadable streamed reply".to_string(),
            Self::Request(_) => "Could not reach the completion API".to_string(),
            Self::Decode(_) | Self::EmptyResponse => {
                "Received an unreadable reply from the completion API".to_string()
            }
            Self::InvalidHeader { name, .. } => format!("Invalid client setting for {}", name),
            Self::Busy => "A reply is already in progress".to_string(),
        }
    }

    /// Raw payload carried by the error, if any
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            Self::Transport { body, .. } => Some(body),
            Self::Stream(failure) => Some(&failure.payload),
            Self::MalformedEvent { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

fn detail<'a>(message: &'a Option<String>, body: &'a String) -> &'a str {
    message.as_deref().unwrap_or(body)
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// Extract `error.message` from the API's JSON error envelope
fn api_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_from_status() {
        assert_eq!(ErrorReason::from_status(StatusCode::TOO_MANY_REQUESTS), ErrorReason::RateLimited);
        assert_eq!(ErrorReason::from_status(StatusCode::UNAUTHORIZED), ErrorReason::Unauthorized);
        assert_eq!(ErrorReason::from_status(StatusCode::BAD_GATEWAY), ErrorReason::Server);
        assert_eq!(ErrorReason::from_status(StatusCode::IM_A_TEAPOT), ErrorReason::Other);
    }

    #[test]
    fn test_transport_error_decodes_envelope() {
        let body = r#"{"error":{"message":"Rate limit reached","type":"requests"}}"#;
        let err = ChatError::transport(StatusCode::TOO_MANY_REQUESTS, body);

        match &err {
            ChatError::Transport { reason, message, body: raw, .. } => {
                assert_eq!(*reason, ErrorReason::RateLimited);
                assert_eq!(message.as_deref(), Some("Rate limit reached"));
                assert_eq!(raw, body);
            }
            other => panic!("Expected Transport, got {:?}", other),
        }
        assert_eq!(err.status(), Some(StatusCode::TOO_MANY_REQUESTS));
        assert!(err.to_string().contains("Rate limit reached"));
        assert!(err.user_notice().contains("429"));
    }

    #[test]
    fn test_transport_error_keeps_plain_body() {
        let err = ChatError::transport(StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded");
        assert!(err.to_string().contains("upstream exploded"));
        assert_eq!(err.raw_body(), Some("upstream exploded"));
    }

    #[test]
    fn test_stream_failure_from_error_event() {
        let failure = StreamFailure::error_event(r#"{"error":{"message":"overloaded"}}"#);
        assert_eq!(failure.reason, StreamFailureReason::ErrorEvent);
        assert_eq!(failure.message.as_deref(), Some("overloaded"));

        let opaque = StreamFailure::error_event("connection reset");
        assert_eq!(opaque.message, None);
        assert_eq!(opaque.payload, "connection reset");
    }
}
