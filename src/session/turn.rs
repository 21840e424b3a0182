//! Conversation records: turns and the tool calls they carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// End user.
    User,
    /// Reasoning engine.
    Assistant,
    /// Result of a data lookup.
    Tool,
}

/// Turn body: plain text, or a structured payload for tool results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    /// Natural-language text.
    Text(String),
    /// Structured JSON payload.
    Structured(Value),
}

impl TurnContent {
    /// Renders the content as text for the engine.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(value) => value.to_string(),
        }
    }
}

/// Lifecycle of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    /// Requested but not yet executed.
    Pending,
    /// Adapter returned successfully.
    Done,
    /// Arguments were rejected or the adapter reported a failure.
    Failed,
}

/// One tool invocation requested by the engine, with its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Provider-assigned call id, echoed back in the matching tool turn.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Parsed arguments. Empty when the engine sent invalid JSON.
    pub arguments: Map<String, Value>,
    /// Adapter response, or the failure payload.
    pub result: Value,
    /// Current status.
    pub status: ToolCallStatus,
}

impl ToolCallRecord {
    /// A freshly requested call.
    #[must_use]
    pub fn pending(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            result: Value::Null,
            status: ToolCallStatus::Pending,
        }
    }

    /// Records the outcome. Calls that already finished are left alone.
    pub fn finish(&mut self, result: Value, success: bool) {
        if self.status != ToolCallStatus::Pending {
            return;
        }
        self.result = result;
        self.status = if success {
            ToolCallStatus::Done
        } else {
            ToolCallStatus::Failed
        };
    }
}

/// One message unit in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Author.
    pub role: TurnRole,
    /// Body.
    pub content: TurnContent,
    /// Tool calls the engine requested in this turn (assistant turns only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,
    /// Call this turn answers (tool turns only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// When the turn was recorded.
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// A user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(TurnRole::User, TurnContent::Text(text.into()))
    }

    /// An engine answer, optionally carrying the tool calls it requested.
    #[must_use]
    pub fn assistant(text: impl Into<String>, tool_calls: Vec<ToolCallRecord>) -> Self {
        Self {
            tool_calls,
            ..Self::new(TurnRole::Assistant, TurnContent::Text(text.into()))
        }
    }

    /// The result of one tool call.
    #[must_use]
    pub fn tool(tool_call_id: impl Into<String>, payload: Value) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(TurnRole::Tool, TurnContent::Structured(payload))
        }
    }

    fn new(role: TurnRole, content: TurnContent) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            created_at: Utc::now(),
        }
    }
}
