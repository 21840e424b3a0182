//! MCP transports: stdio and streamable HTTP.

use std::sync::Arc;

use rmcp::ServiceExt;
use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::server::FdaMcpServer;

/// Serves MCP over stdin/stdout until the client disconnects.
///
/// # Errors
///
/// Returns an error if the handshake fails or the transport breaks.
pub async fn serve_stdio(server: FdaMcpServer) -> anyhow::Result<()> {
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}

/// Serves MCP's streamable HTTP transport at `http://{host}:{port}/mcp`.
///
/// Each MCP session gets a clone of `server`, so all sessions share one
/// data source. Stops on Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve_http(server: FdaMcpServer, host: &str, port: u16) -> anyhow::Result<()> {
    let ct = CancellationToken::new();

    let service = StreamableHttpService::new(
        move || Ok::<_, std::io::Error>(server.clone()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            cancellation_token: ct.child_token(),
            ..Default::default()
        },
    );

    let router = axum::Router::new().nest_service("/mcp", service);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // stdout stays free for the stdio transport; logs go to stderr
    info!(%addr, "MCP server listening on http://{addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            ct.cancel();
        })
        .await?;

    Ok(())
}
