//! Request handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::AppState;
use super::error::ServerError;
use super::sse;
use crate::agent::{TurnReply, validate_message};

/// Body of `POST /chat` and `POST /chat/stream`.
#[derive(Debug, Deserialize)]
pub struct ChatBody {
    /// User message.
    #[serde(default)]
    pub message: String,
    /// Session to continue; a new one is created when absent.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Health of one dependency.
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    /// Whether the dependency answered.
    pub ok: bool,
    /// Engine provider name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<&'static str>,
    /// Failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// `healthy` when every dependency answered, otherwise `degraded`.
    pub status: &'static str,
    /// Reasoning engine reachability.
    pub engine: ComponentHealth,
    /// openFDA reachability.
    pub data_source: ComponentHealth,
    /// Live session count.
    pub sessions: usize,
}

pub(super) async fn chat_stream(
    State(state): State<AppState>,
    payload: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Response, ServerError> {
    let Json(body) = payload?;
    validate_message(&body.message)?;
    let lease = state.sessions.get_or_create(body.session_id.as_deref())?;
    let turn = state.orchestrator.handle_turn(lease, body.message);
    Ok(sse::turn_response(turn, state.keep_alive))
}

pub(super) async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<TurnReply>, ServerError> {
    let Json(body) = payload?;
    validate_message(&body.message)?;
    let lease = state.sessions.get_or_create(body.session_id.as_deref())?;
    let reply = state.orchestrator.complete_turn(lease, body.message).await?;
    Ok(Json(reply))
}

pub(super) async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServerError> {
    state.sessions.reset(&id)?;
    info!(session_id = %id, "session reset by client");
    Ok(Json(json!({"status": "success", "session_id": id})))
}

pub(super) async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let provider = state.orchestrator.provider();
    let (engine, data_source) = tokio::join!(provider.health_check(), state.data_source.health_check());

    let engine = ComponentHealth {
        ok: engine.is_ok(),
        provider: Some(provider.name()),
        error: engine.err().map(|e| e.to_string()),
    };
    let data_source = ComponentHealth {
        ok: data_source.is_ok(),
        provider: None,
        error: data_source.err().map(|e| e.to_string()),
    };
    let status = if engine.ok && data_source.ok {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthReport {
        status,
        engine,
        data_source,
        sessions: state.sessions.len(),
    })
}
