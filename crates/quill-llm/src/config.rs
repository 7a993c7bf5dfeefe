// Client configuration: credentials, endpoint and optional headers/timeouts

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Environment variable that overrides the organization header
pub const ORGANIZATION_ENV: &str = "OPENAI_ORGANIZATION";

/// Configuration for an OpenAI-compatible completion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_key: String,
    /// Base URL for the API (defaults to https://api.openai.com/v1)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sent as `OpenAI-Organization` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Attribution headers (`HTTP-Referer`, `X-Title`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
    /// Bounds a whole buffered request; streamed replies use the idle timeout instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_idle_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    OPENAI_API_BASE.to_string()
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            organization: None,
            referer: None,
            title: None,
            connect_timeout_secs: None,
            request_timeout_secs: None,
            stream_idle_timeout_secs: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_attribution(mut self, referer: impl Into<String>, title: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self.title = Some(title.into());
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = Some(secs);
        self
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    pub fn with_stream_idle_timeout(mut self, secs: u64) -> Self {
        self.stream_idle_timeout_secs = Some(secs);
        self
    }

    /// Apply `OPENAI_ORGANIZATION` from the environment, if set and non-empty
    pub fn with_env_overrides(self) -> Self {
        self.with_organization_override(std::env::var(ORGANIZATION_ENV).ok())
    }

    fn with_organization_override(mut self, value: Option<String>) -> Self {
        if let Some(org) = value.filter(|v| !v.trim().is_empty()) {
            self.organization = Some(org);
        }
        self
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn stream_idle_timeout(&self) -> Option<Duration> {
        self.stream_idle_timeout_secs.map(Duration::from_secs)
    }

    /// Full URL of the chat completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
