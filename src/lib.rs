//! # openfda-chat
//!
//! A medication Q&A assistant over the U.S. FDA's public drug APIs.
//!
//! A reasoning engine (any OpenAI-compatible chat model, Gemini by default)
//! decides which openFDA lookups to run; the orchestration loop executes
//! them, feeds the results back, and streams the answer to the client as
//! server-sent events.
//!
//! ## Layout
//!
//! - [`agent`]: engine providers, tool registry, orchestration loop
//! - [`fda`]: openFDA data source adapter
//! - [`session`]: per-conversation turn history
//! - [`server`]: axum HTTP/SSE front end
//! - [`cli`]: the `openfda-chat` command line
//! - `mcp`: the tool catalogue as an MCP server (feature `mcp`)
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use openfda_chat::agent::{AgentConfig, Orchestrator, create_provider};
//! use openfda_chat::fda::{FdaConfig, OpenFdaClient};
//! use openfda_chat::session::SessionStore;
//!
//! # async fn run() -> openfda_chat::Result<()> {
//! let config = AgentConfig::from_env()?;
//! let provider = create_provider(&config)?;
//! let fda = Arc::new(OpenFdaClient::new(FdaConfig::from_env())?);
//! let orchestrator = Orchestrator::new(provider, fda, config);
//!
//! let store = SessionStore::new();
//! let session = store.get_or_create(None)?;
//! let reply = orchestrator
//!     .complete_turn(session, "Is there a shortage of amoxicillin?".to_string())
//!     .await?;
//! println!("{}", reply.response);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod error;
pub mod fda;
#[cfg(feature = "mcp")]
pub mod mcp;
pub mod server;
pub mod session;

pub use agent::{AgentConfig, Orchestrator, StreamEvent};
pub use error::{Error, Result};
pub use fda::{AdapterResponse, DataSource};
pub use session::{Session, SessionStore};
