//! Events emitted by the orchestration loop while a turn runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Longest tool output kept in a [`ToolUsage`] summary, in characters.
pub const TOOL_OUTPUT_PREVIEW_CHARS: usize = 500;

/// One step of a streamed turn.
///
/// Serializes to the event payload only; the tag travels separately as the
/// SSE event name (see [`StreamEvent::name`]).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    /// Incremental answer text.
    TextDelta {
        /// Text fragment.
        text: String,
    },
    /// A data lookup is starting.
    ToolStart {
        /// Tool name.
        tool_name: String,
        /// Parsed arguments (an empty object if the engine sent invalid JSON).
        tool_args: Value,
    },
    /// A data lookup finished.
    ToolEnd {
        /// Tool name.
        tool_name: String,
        /// Whether the adapter reported success.
        success: bool,
        /// Failure description.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// The turn is over.
    Done {
        /// Session the turn belongs to.
        session_id: String,
        /// Lookups run during the turn; `null` when none ran.
        tools_used: Option<Vec<ToolUsage>>,
    },
    /// The reasoning engine failed; a `Done` follows.
    Error {
        /// Failure description.
        message: String,
    },
}

impl StreamEvent {
    /// Wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TextDelta { .. } => "text_delta",
            Self::ToolStart { .. } => "tool_start",
            Self::ToolEnd { .. } => "tool_end",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    /// Shorthand for a text fragment.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextDelta { text: text.into() }
    }
}

/// Summary of one tool call, reported in the `done` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUsage {
    /// Tool name.
    pub name: String,
    /// Arguments the engine supplied.
    pub arguments: Value,
    /// Serialized adapter response, cut to [`TOOL_OUTPUT_PREVIEW_CHARS`].
    pub output: String,
}

impl ToolUsage {
    /// Builds a summary, truncating `output` on a character boundary.
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: Value, output: &str) -> Self {
        Self {
            name: name.into(),
            arguments,
            output: output.chars().take(TOOL_OUTPUT_PREVIEW_CHARS).collect(),
        }
    }
}
