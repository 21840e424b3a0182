//! Provider-agnostic message types for reasoning-engine calls.
//!
//! These types decouple the orchestration loop from any specific LLM SDK.
//! Session [`Turn`](crate::session::Turn)s are projected into
//! [`ChatMessage`]s right before each engine round.

use serde::{Deserialize, Serialize};

use super::tool::{ToolCall, ToolDescriptor};

/// Role of a chat message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System framing.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
    /// Tool result.
    Tool,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Message content.
    pub content: String,
    /// Tool calls requested by the assistant (only for `Role::Assistant`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Tool call ID this message responds to (only for `Role::Tool`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// A streaming chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier (e.g., "gemini-2.5-flash").
    pub model: String,
    /// Ordered conversation messages, system framing first.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature (0.0–2.0).
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Tools the engine may call this round.
    pub tools: Vec<ToolDescriptor>,
}

/// One item of an engine output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineChunk {
    /// Incremental answer text.
    Text(String),
    /// A complete tool invocation request.
    ToolCall(ToolCall),
}

/// Creates a system message.
#[must_use]
pub fn system_message(content: &str) -> ChatMessage {
    ChatMessage {
        role: Role::System,
        content: content.to_string(),
        tool_calls: Vec::new(),
        tool_call_id: None,
    }
}

/// Creates a user message.
#[must_use]
pub fn user_message(content: &str) -> ChatMessage {
    ChatMessage {
        role: Role::User,
        content: content.to_string(),
        tool_calls: Vec::new(),
        tool_call_id: None,
    }
}

/// Creates an assistant message, optionally carrying tool calls.
#[must_use]
pub fn assistant_message(content: &str, tool_calls: Vec<ToolCall>) -> ChatMessage {
    ChatMessage {
        role: Role::Assistant,
        content: content.to_string(),
        tool_calls,
        tool_call_id: None,
    }
}

/// Creates a tool result message.
#[must_use]
pub fn tool_message(tool_call_id: &str, content: &str) -> ChatMessage {
    ChatMessage {
        role: Role::Tool,
        content: content.to_string(),
        tool_calls: Vec::new(),
        tool_call_id: Some(tool_call_id.to_string()),
    }
}
