//! MCP (Model Context Protocol) server for openfda-chat.
//!
//! Publishes the openFDA tool catalogue to external agents, so an MCP
//! client can run the same lookups the chat assistant uses without going
//! through the chat loop.
//!
//! # Feature Gate
//!
//! This module requires the `mcp` feature flag (enabled by default).
//!
//! # Architecture
//!
//! ```text
//! MCP Client
//!   ↓ tools/call search_recalls {term, risk_level}
//! FdaMcpServer
//!   ↓ DataSource::call
//! OpenFdaClient → api.fda.gov
//!   ↓
//! {success, data, error} JSON → MCP Client
//! ```

pub mod server;
pub mod transport;

pub use server::FdaMcpServer;
pub use transport::{serve_http, serve_stdio};
