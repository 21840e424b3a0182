//! openfda-chat command-line entry point.

use clap::Parser;
use openfda_chat::cli::{Cli, execute};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "openfda_chat=info,tower_http=info";

fn main() -> anyhow::Result<()> {
    // stdout carries command output and the MCP stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = execute(&cli)?;

    if !output.is_empty() {
        #[allow(clippy::print_stdout)]
        {
            print!("{output}");
        }
    }
    Ok(())
}
