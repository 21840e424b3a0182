//! HTTP error responses.
//!
//! Every failure renders as `{"error": {"code": …, "message": …}}` with a
//! status chosen by the variant.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::error::{AgentError, SessionError};

/// Error body payload.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable description.
    pub message: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Failures surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Malformed request, rejected before any turn starts.
    #[error("{message}")]
    BadRequest {
        /// Error code, e.g. `invalid_message`.
        code: &'static str,
        /// Error description.
        message: String,
    },

    /// Another turn is running for the session.
    #[error("{0}")]
    SessionBusy(String),

    /// No session has the requested id.
    #[error("{0}")]
    SessionNotFound(String),

    /// The reasoning engine failed.
    #[error("{0}")]
    Engine(String),

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl ServerError {
    /// HTTP status for the variant.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::SessionBusy(_) => StatusCode::CONFLICT,
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::Engine(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error code for the response body.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::BadRequest { code, .. } => code,
            Self::SessionBusy(_) => "session_busy",
            Self::SessionNotFound(_) => "session_not_found",
            Self::Engine(_) => "engine_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), "{self}");
        } else {
            warn!(code = self.code(), "{self}");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<SessionError> for ServerError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Busy { .. } => Self::SessionBusy(err.to_string()),
            SessionError::NotFound { .. } => Self::SessionNotFound(err.to_string()),
            SessionError::InvalidId { .. } => Self::BadRequest {
                code: "invalid_session_id",
                message: err.to_string(),
            },
        }
    }
}

impl From<AgentError> for ServerError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Orchestration { message } => Self::BadRequest {
                code: "invalid_message",
                message,
            },
            AgentError::Stream { message } => Self::Engine(message),
            aborted @ AgentError::TurnAborted { .. } => Self::Internal(aborted.to_string()),
            other => Self::Engine(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest {
            code: "invalid_request",
            message: rejection.body_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(SessionError::Busy { id: "a".into() } => StatusCode::CONFLICT ; "busy")]
    #[test_case(SessionError::NotFound { id: "a".into() } => StatusCode::NOT_FOUND ; "not found")]
    #[test_case(SessionError::InvalidId { reason: "x".into() } => StatusCode::BAD_REQUEST ; "invalid id")]
    fn test_session_error_status(err: SessionError) -> StatusCode {
        ServerError::from(err).status()
    }

    #[test]
    fn test_engine_failure_is_bad_gateway() {
        let err = ServerError::from(AgentError::Stream {
            message: "quota exceeded".to_string(),
        });
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code(), "engine_error");
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[test]
    fn test_validation_failure_is_bad_request() {
        let err = ServerError::from(AgentError::Orchestration {
            message: "Message cannot be empty".to_string(),
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "invalid_message");
    }

    #[test]
    fn test_aborted_turn_is_internal() {
        let err = ServerError::from(AgentError::TurnAborted {
            message: "turn ended without a done event".to_string(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "internal_error");
    }
}
