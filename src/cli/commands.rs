//! CLI command implementations.
//!
//! Each command returns the text to print; long-running commands (`serve`,
//! `mcp`) return an empty string once they shut down.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "mcp")]
use crate::cli::parser::McpCommands;
use crate::cli::parser::{Cli, Commands, OutputFormat, PromptsCommands};
use crate::agent::{AgentConfig, Orchestrator, PromptSet, ToolRegistry, TurnReply, create_provider};
use crate::error::{CommandError, Result};
use crate::fda::{DataSource, FdaConfig, OpenFdaClient};
use crate::server::{self, AppState, ServerConfig};
use crate::session::SessionStore;

/// Executes the parsed CLI command.
///
/// # Errors
///
/// Returns an error if configuration is incomplete or the command fails.
pub fn execute(cli: &Cli) -> Result<String> {
    match &cli.command {
        Commands::Serve {
            host,
            port,
            session_ttl_secs,
        } => {
            let config = ServerConfig {
                host: host.clone(),
                port: *port,
                session_ttl: Duration::from_secs(*session_ttl_secs),
                ..ServerConfig::default()
            };
            cmd_serve(&config)
        }
        Commands::Ask {
            message,
            model,
            max_tool_rounds,
        } => {
            let mut builder = AgentConfig::builder();
            if let Some(model) = model {
                builder = builder.model(model);
            }
            if let Some(n) = max_tool_rounds {
                builder = builder.max_tool_rounds(*n);
            }
            let config = builder.from_env().build()?;
            cmd_ask(config, message, cli.format)
        }
        Commands::Tools => cmd_tools(cli.format),
        Commands::Prompts(PromptsCommands::Init { dir }) => cmd_prompts_init(dir.as_deref()),
        #[cfg(feature = "mcp")]
        Commands::Mcp(sub) => cmd_mcp(sub),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

/// Wires engine, adapter and orchestrator from configuration.
fn build_orchestrator(config: AgentConfig) -> Result<(Orchestrator, Arc<dyn DataSource>)> {
    let provider = create_provider(&config)?;
    let data_source: Arc<dyn DataSource> = Arc::new(OpenFdaClient::new(FdaConfig::from_env())?);
    let orchestrator = Orchestrator::new(provider, Arc::clone(&data_source), config);
    Ok((orchestrator, data_source))
}

fn cmd_serve(config: &ServerConfig) -> Result<String> {
    let (orchestrator, data_source) = build_orchestrator(AgentConfig::from_env()?)?;
    let state = AppState::new(orchestrator, data_source);

    runtime()?
        .block_on(server::serve(state, config))
        .map_err(|e| CommandError::ExecutionFailed(format!("Server error: {e}")))?;
    Ok(String::new())
}

fn cmd_ask(
    config: AgentConfig,
    message: &str,
    format: OutputFormat,
) -> Result<String> {
    crate::agent::validate_message(message)?;
    let (orchestrator, _) = build_orchestrator(config)?;
    let store = SessionStore::new();
    let lease = store.get_or_create(None)?;

    let reply = runtime()?.block_on(orchestrator.complete_turn(lease, message.to_string()))?;
    match format {
        OutputFormat::Text => Ok(format_reply(&reply)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&reply)?),
    }
}

fn format_reply(reply: &TurnReply) -> String {
    let mut out = reply.response.trim_end().to_string();
    out.push('\n');
    if let Some(tools) = &reply.tools_used {
        out.push_str("\nTools used:\n");
        for usage in tools {
            let _ = writeln!(out, "  - {} {}", usage.name, usage.arguments);
        }
    }
    let _ = writeln!(out, "\nsession: {}", reply.session_id);
    out
}

fn cmd_tools(format: OutputFormat) -> Result<String> {
    let registry = ToolRegistry::fda();
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(registry.descriptors())?),
        OutputFormat::Text => {
            let width = registry
                .descriptors()
                .iter()
                .map(|d| d.name.len())
                .max()
                .unwrap_or(0);
            let mut out = String::new();
            for d in registry.descriptors() {
                let summary = d.description.lines().next().unwrap_or_default();
                let _ = writeln!(out, "{:width$}  {}", d.name, d.display_label);
                let _ = writeln!(out, "{:width$}  {summary}", "");
            }
            Ok(out)
        }
    }
}

fn cmd_prompts_init(dir: Option<&Path>) -> Result<String> {
    let dir = dir
        .map(Path::to_path_buf)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| CommandError::ExecutionFailed("cannot determine home directory".into()))?;

    let written = PromptSet::write_defaults(&dir)?;
    if written.is_empty() {
        return Ok(format!("Prompts already present in {}\n", dir.display()));
    }
    let mut out = String::new();
    for path in written {
        let _ = writeln!(out, "Wrote {}", path.display());
    }
    Ok(out)
}

#[cfg(feature = "mcp")]
fn cmd_mcp(cmd: &McpCommands) -> Result<String> {
    use crate::mcp::{FdaMcpServer, serve_http, serve_stdio};

    let server = FdaMcpServer::from_env()?;
    runtime()?
        .block_on(async {
            match cmd {
                McpCommands::Stdio => serve_stdio(server).await,
                McpCommands::Http { host, port } => serve_http(server, host, *port).await,
            }
        })
        .map_err(|e| CommandError::ExecutionFailed(format!("MCP server error: {e}")))?;

    Ok(String::new())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::ToolUsage;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_tools_text_lists_every_tool() {
        let out = cmd_tools(OutputFormat::Text).unwrap_or_else(|e| panic!("{e}"));
        for d in ToolRegistry::fda().descriptors() {
            assert!(out.contains(&d.name), "missing {}", d.name);
        }
    }

    #[test]
    fn test_tools_json_is_array() {
        let out = cmd_tools(OutputFormat::Json).unwrap_or_else(|e| panic!("{e}"));
        let parsed: serde_json::Value =
            serde_json::from_str(&out).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(parsed.as_array().map(Vec::len), Some(11));
    }

    #[test]
    fn test_prompts_init_is_idempotent() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("{e}"));
        let first = cmd_prompts_init(Some(dir.path())).unwrap_or_else(|e| panic!("{e}"));
        assert!(first.starts_with("Wrote"));
        let second = cmd_prompts_init(Some(dir.path())).unwrap_or_else(|e| panic!("{e}"));
        assert!(second.starts_with("Prompts already present"));
    }

    #[test]
    fn test_format_reply_lists_tools() {
        let reply = TurnReply {
            response: "Lisinopril treats high blood pressure.".to_string(),
            session_id: "s1".to_string(),
            tools_used: Some(vec![ToolUsage::new(
                "get_drug_label",
                json!({"term": "Lisinopril"}),
                "{}",
            )]),
        };
        let out = format_reply(&reply);
        assert!(out.contains("Tools used:"));
        assert!(out.contains(r#"get_drug_label {"term":"Lisinopril"}"#));
        assert!(out.ends_with("session: s1\n"));
    }
}
