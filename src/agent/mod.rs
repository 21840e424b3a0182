//! Streaming chat orchestration over a tool-calling reasoning engine.
//!
//! A turn runs as a bounded loop: the engine streams text and tool calls,
//! the executor runs each call against the openFDA [`DataSource`], results
//! go back into the conversation, and the engine is asked again until it
//! answers in plain text or the round limit is reached.
//!
//! # Architecture
//!
//! ```text
//! user text → Orchestrator::handle_turn → TurnStream (lazy)
//!   └── run_turn (spawned task)
//!       ├── LlmProvider::chat_stream → text_delta …
//!       ├── ToolExecutor::execute → tool_start / tool_end
//!       │   └── DataSource::call → AdapterResponse
//!       ├── commit round to Session
//!       └── done {session_id, tools_used}
//! ```
//!
//! [`DataSource`]: crate::fda::DataSource

pub mod agentic_loop;
pub mod client;
pub mod config;
pub mod events;
pub mod executor;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod tool;

// Re-export key types
pub use agentic_loop::TurnOutcome;
pub use client::create_provider;
pub use config::AgentConfig;
pub use events::{StreamEvent, ToolUsage};
pub use executor::ToolExecutor;
pub use message::{ChatMessage, ChatRequest, EngineChunk, Role};
pub use orchestrator::{Orchestrator, TurnReply, TurnStream, validate_message};
pub use prompt::PromptSet;
pub use provider::{EngineStream, LlmProvider};
pub use tool::{ToolCall, ToolDescriptor, ToolRegistry};
