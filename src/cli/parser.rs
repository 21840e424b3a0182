//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::server::DEFAULT_PORT;

/// openfda-chat: a medication assistant over live FDA drug data.
///
/// Answers questions about adverse events, drug labels, recalls and
/// shortages by letting a reasoning engine call openFDA lookups.
#[derive(Parser, Debug)]
#[command(name = "openfda-chat")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP/SSE chat server.
    #[command(after_help = r#"Examples:
  openfda-chat serve                          # Listen on 127.0.0.1:8000
  openfda-chat serve --host 0.0.0.0 --port 9000
  GEMINI_API_KEY=... openfda-chat serve --session-ttl-secs 600
"#)]
    Serve {
        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1", env = "OPENFDA_CHAT_HOST")]
        host: String,

        /// Port to listen on.
        #[arg(short, long, default_value_t = DEFAULT_PORT, env = "OPENFDA_CHAT_PORT")]
        port: u16,

        /// Seconds a session may stay idle before it is dropped.
        #[arg(long, default_value = "3600", env = "OPENFDA_CHAT_SESSION_TTL_SECS")]
        session_ttl_secs: u64,
    },

    /// Ask a single question and print the answer.
    ///
    /// Runs one turn in-process, with the same tools the server offers.
    #[command(after_help = r#"Examples:
  openfda-chat ask "What is Lisinopril used for?"
  openfda-chat ask "Any Class I recalls this month?" --format json
"#)]
    Ask {
        /// The question.
        message: String,

        /// Model override.
        #[arg(short, long)]
        model: Option<String>,

        /// Maximum engine rounds for the turn.
        #[arg(long)]
        max_tool_rounds: Option<usize>,
    },

    /// List the tools offered to the reasoning engine.
    Tools,

    /// Manage prompt templates.
    #[command(subcommand)]
    Prompts(PromptsCommands),

    /// Expose the openFDA tools as an MCP server.
    #[cfg(feature = "mcp")]
    #[command(subcommand)]
    Mcp(McpCommands),
}

/// Prompt template commands.
#[derive(Subcommand, Debug)]
pub enum PromptsCommands {
    /// Write the default system prompt for editing.
    ///
    /// Existing files are left untouched.
    #[command(after_help = r#"Examples:
  openfda-chat prompts init                  # ~/.config/openfda-chat/prompts
  openfda-chat prompts init --dir ./prompts
"#)]
    Init {
        /// Target directory.
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

/// MCP server transports.
#[cfg(feature = "mcp")]
#[derive(Subcommand, Debug)]
pub enum McpCommands {
    /// Start MCP server with stdio transport.
    ///
    /// Reads JSON-RPC messages from stdin, writes responses to stdout.
    #[command(after_help = r#"Examples:
  openfda-chat mcp stdio
"#)]
    Stdio,

    /// Start MCP server with streamable HTTP transport.
    #[command(after_help = r#"Examples:
  openfda-chat mcp http                      # Listen on 127.0.0.1:3000
  openfda-chat mcp http --host 0.0.0.0 --port 8080
"#)]
    Http {
        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}
