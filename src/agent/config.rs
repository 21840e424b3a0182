//! Reasoning-engine configuration with builder pattern and environment
//! variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AgentError;

/// Default provider name.
const DEFAULT_PROVIDER: &str = "gemini";
/// Default model identifier.
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Default maximum tokens per engine round.
const DEFAULT_MAX_TOKENS: u32 = 8192;
/// Default wait for the next engine chunk, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default bound on decide→tool→summarize rounds per turn.
const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;

/// Configuration for the reasoning engine and the orchestration loop.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Provider name (`"gemini"` or `"openai"`).
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Maximum tokens the engine may generate per round.
    pub max_tokens: u32,
    /// Sampling temperature; `None` uses the provider default.
    pub temperature: Option<f32>,
    /// Longest silence tolerated between two engine chunks before the
    /// round is treated as an engine failure.
    pub timeout: Duration,
    /// Maximum engine rounds per user turn. A round is one engine call plus
    /// the tool calls it requested.
    pub max_tool_rounds: usize,
    /// Directory containing the `system.md` prompt override.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    timeout: Option<Duration>,
    max_tool_rounds: Option<usize>,
    prompt_dir: Option<PathBuf>,
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("OPENFDA_CHAT_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .or_else(|_| std::env::var("OPENFDA_CHAT_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENFDA_CHAT_BASE_URL")
                .or_else(|_| std::env::var("OPENAI_BASE_URL"))
                .ok();
        }
        if self.model.is_none() {
            self.model = std::env::var("OPENFDA_CHAT_MODEL").ok();
        }
        if self.timeout.is_none() {
            self.timeout = std::env::var("OPENFDA_CHAT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs);
        }
        if self.max_tool_rounds.is_none() {
            self.max_tool_rounds = std::env::var("OPENFDA_CHAT_MAX_TOOL_ROUNDS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("OPENFDA_CHAT_PROMPT_DIR")
                .ok()
                .map(PathBuf::from);
        }
        self
    }

    /// Sets the provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the maximum tokens per round.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Sets the engine chunk timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the maximum rounds per turn.
    #[must_use]
    pub const fn max_tool_rounds(mut self, n: usize) -> Self {
        self.max_tool_rounds = Some(n);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(AgentError::ApiKeyMissing)?;

        Ok(AgentConfig {
            provider: self
                .provider
                .unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            api_key,
            base_url: self.base_url,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: self.temperature,
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_tool_rounds: self
                .max_tool_rounds
                .unwrap_or(DEFAULT_MAX_TOOL_ROUNDS)
                .max(1),
            prompt_dir: self.prompt_dir,
        })
    }
}
