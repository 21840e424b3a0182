//! CLI layer for openfda-chat.
//!
//! Provides the command-line interface using clap: the chat server, a
//! one-shot `ask`, tool listing, prompt scaffolding and the MCP server.

pub mod commands;
pub mod parser;

pub use commands::execute;
#[cfg(feature = "mcp")]
pub use parser::McpCommands;
pub use parser::{Cli, Commands, OutputFormat, PromptsCommands};
