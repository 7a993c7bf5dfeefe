use config::{Config as ConfigLoader, ConfigError, Environment, File};
use quill_llm::{ClientConfig, ReplyMode, RequestParams};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub openai_api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Stream replies as they are generated
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    /// Bounds a whole buffered request
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub stream_idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LlmConfig {
    pub fn request_params(&self) -> RequestParams {
        let params = RequestParams::new(&self.model)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);
        match &self.system_prompt {
            Some(prompt) => params.system_prompt(prompt),
            None => params,
        }
    }

    pub fn reply_mode(&self) -> ReplyMode {
        ReplyMode::from_stream_flag(self.stream)
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables (QUILL_ prefix, `__` between section and key)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            // 1. Load default config
            .add_source(File::with_name("config/default").required(false))
            // 2. Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // 3. Environment variables override everything, e.g. QUILL_LLM__MODEL
            .add_source(
                Environment::with_prefix("QUILL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
            );

        let mut cfg: Config = builder.build()?.try_deserialize()?;

        // Load secrets from ENV (not in TOML)
        cfg.openai_api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::Message("OPENAI_API_KEY environment variable is required".to_string()))?;

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder()
            .add_source(File::from(path.as_ref()));

        builder.build()?.try_deserialize()
    }

    /// Client settings for the completion endpoint
    pub fn client_config(&self) -> ClientConfig {
        let mut client = ClientConfig::new(&self.openai_api_key)
            .with_attribution("https://github.com/your-org/quill", "Quill")
            .with_env_overrides();
        if let Some(base_url) = &self.llm.base_url {
            client = client.with_base_url(base_url);
        }
        if let Some(secs) = self.llm.connect_timeout_secs {
            client = client.with_connect_timeout(secs);
        }
        if let Some(secs) = self.llm.request_timeout_secs {
            client = client.with_request_timeout(secs);
        }
        if let Some(secs) = self.llm.stream_idle_timeout_secs {
            client = client.with_stream_idle_timeout(secs);
        }
        client
    }
}
