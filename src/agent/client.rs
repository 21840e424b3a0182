//! Provider registry and factory.
//!
//! Maps provider names to concrete [`LlmProvider`] implementations.

use std::sync::Arc;

use crate::agent::config::AgentConfig;
use crate::agent::provider::LlmProvider;
use crate::agent::providers::OpenAiProvider;
use crate::error::AgentError;

/// Creates an [`LlmProvider`] based on the configured provider name.
///
/// # Supported Providers
///
/// - `"gemini"` (default): alias for `"openai"` with Gemini's
///   OpenAI-compatible endpoint as the default base URL
/// - `"openai"`: OpenAI-compatible APIs via `async-openai`
///
/// # Errors
///
/// Returns [`AgentError::UnsupportedProvider`] for unknown provider names.
pub fn create_provider(config: &AgentConfig) -> Result<Arc<dyn LlmProvider>, AgentError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config))),
        "gemini" => {
            let mut config = config.clone();
            if config.base_url.is_none() {
                config.base_url = Some(GEMINI_OPENAI_BASE_URL.to_string());
            }
            Ok(Arc::new(OpenAiProvider::new(&config)))
        }
        other => Err(AgentError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}

/// Gemini's OpenAI-compatible endpoint.
const GEMINI_OPENAI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_openai_provider() {
        let config = AgentConfig::builder()
            .api_key("test")
            .provider("openai")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let provider = create_provider(&config).unwrap_or_else(|_| unreachable!());
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn test_create_gemini_alias() {
        let config = AgentConfig::builder()
            .api_key("test")
            .provider("gemini")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert!(create_provider(&config).is_ok());
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = AgentConfig::builder()
            .api_key("test")
            .provider("unknown")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert!(matches!(
            create_provider(&config),
            Err(AgentError::UnsupportedProvider { .. })
        ));
    }
}
