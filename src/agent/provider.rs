//! Pluggable reasoning-engine trait.
//!
//! Implementations translate a provider-agnostic [`ChatRequest`] into
//! provider-specific SDK calls and hand back a pull-based stream of
//! [`EngineChunk`]s, so the orchestration loop never registers callbacks.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use super::message::{ChatRequest, EngineChunk};
use crate::error::AgentError;

/// Boxed stream of engine output.
pub type EngineStream = Pin<Box<dyn Stream<Item = Result<EngineChunk, AgentError>> + Send>>;

/// Trait for reasoning-engine backends.
///
/// Implementations handle the transport layer (HTTP, SDK calls, retries)
/// for a specific provider while presenting a uniform interface to the
/// orchestration loop.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`).
    fn name(&self) -> &'static str;

    /// Starts a streaming completion.
    ///
    /// Text arrives as [`EngineChunk::Text`] fragments in order. Tool calls
    /// arrive as complete [`EngineChunk::ToolCall`] items, in the order the
    /// engine requested them; providers that receive tool calls in pieces
    /// must assemble them before yielding.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the request cannot be started. Failures
    /// after the first chunk surface as `Err` items inside the stream.
    async fn chat_stream(&self, request: &ChatRequest) -> Result<EngineStream, AgentError>;

    /// Checks that the engine is reachable and the credentials are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] describing why the engine is unavailable.
    async fn health_check(&self) -> Result<(), AgentError>;
}
