//! HTTP/SSE front end.
//!
//! | Route | Purpose |
//! | --- | --- |
//! | `POST /chat/stream` | run a turn, stream events as SSE |
//! | `POST /chat` | run a turn, return the collected answer |
//! | `DELETE /session/{id}` | drop a session's history |
//! | `GET /health` | engine and openFDA reachability, session count |

pub mod error;
pub mod routes;
pub mod sse;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{delete, get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::agent::Orchestrator;
use crate::fda::DataSource;
use crate::session::SessionStore;

pub use error::ServerError;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8000;
/// Default idle time before a session is evicted.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);
/// Default interval between SSE keep-alive comments.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Listener and session lifecycle settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Idle time before a session is evicted.
    pub session_ttl: Duration,
    /// How often the sweeper looks for idle sessions.
    pub sweep_interval: Duration,
    /// Interval between SSE keep-alive comments.
    pub keep_alive: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            session_ttl: DEFAULT_SESSION_TTL,
            sweep_interval: Duration::from_secs(60),
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Runs turns.
    pub orchestrator: Orchestrator,
    /// Conversations by id.
    pub sessions: Arc<SessionStore>,
    /// openFDA adapter, probed by `/health`.
    pub data_source: Arc<dyn DataSource>,
    /// Interval between SSE keep-alive comments.
    pub keep_alive: Duration,
}

impl AppState {
    /// Creates state with an empty session store.
    #[must_use]
    pub fn new(orchestrator: Orchestrator, data_source: Arc<dyn DataSource>) -> Self {
        Self {
            orchestrator,
            sessions: Arc::new(SessionStore::new()),
            data_source,
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }
}

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/chat/stream", post(routes::chat_stream))
        .route("/chat", post(routes::chat))
        .route("/session/{id}", delete(routes::reset_session))
        .route("/health", get(routes::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the router until Ctrl-C, sweeping idle sessions meanwhile.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(mut state: AppState, config: &ServerConfig) -> anyhow::Result<()> {
    state.keep_alive = config.keep_alive;
    let shutdown = CancellationToken::new();
    let sweeper = Arc::clone(&state.sessions).spawn_sweeper(
        config.session_ttl,
        config.sweep_interval,
        shutdown.clone(),
    );

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, provider = state.orchestrator.provider().name(), "listening");

    let stop = shutdown.clone();
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
            stop.cancel();
        })
        .await?;

    shutdown.cancel();
    let _ = sweeper.await;
    Ok(())
}
