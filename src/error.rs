//! Error types for openfda-chat.
//!
//! Each layer has its own error enum: [`AgentError`] for the reasoning
//! engine and orchestration loop, [`FdaError`] for the openFDA transport,
//! [`SessionError`] for the session store and [`CommandError`] for the CLI.
//! The crate-level [`Error`] unifies them for callers that do not care
//! which layer failed.

use thiserror::Error;

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Reasoning engine or orchestration failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// openFDA transport failure.
    #[error(transparent)]
    Fda(#[from] FdaError),

    /// Session store failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failure.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the reasoning engine and the orchestration loop.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key was configured for the provider.
    #[error(
        "no API key configured (set GEMINI_API_KEY, OPENAI_API_KEY or OPENFDA_CHAT_API_KEY)"
    )]
    ApiKeyMissing,

    /// The configured provider name is not supported.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Provider name that was requested.
        name: String,
    },

    /// The engine request failed before any output was produced.
    #[error("engine request failed: {message}")]
    ApiRequest {
        /// Error description.
        message: String,
        /// HTTP status, when the transport reported one.
        status: Option<u16>,
    },

    /// The engine stream failed part way through.
    #[error("engine stream failed: {message}")]
    Stream {
        /// Error description.
        message: String,
    },

    /// The engine produced something the loop cannot interpret.
    #[error("malformed engine response: {message}")]
    MalformedResponse {
        /// Error description.
        message: String,
    },

    /// A tool call could not be executed.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Tool name.
        name: String,
        /// Error description.
        message: String,
    },

    /// The orchestration loop rejected its input.
    #[error("orchestration error: {message}")]
    Orchestration {
        /// Error description.
        message: String,
    },

    /// The turn stopped before it could report a result.
    #[error("turn aborted: {message}")]
    TurnAborted {
        /// Error description.
        message: String,
    },
}

/// Transport-level failures talking to openFDA.
///
/// These never escape the adapter: [`crate::fda::OpenFdaClient`] folds them
/// into a failed [`crate::fda::AdapterResponse`] so the engine can explain
/// them to the user.
#[derive(Debug, Error)]
pub enum FdaError {
    /// Upstream returned a non-success status.
    #[error("API Error: {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Upstream did not answer in time.
    #[error("Request timed out")]
    Timeout,

    /// Connection or protocol failure.
    #[error("Server Error: {0}")]
    Transport(String),

    /// Upstream body was not the JSON we expected.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Tool arguments were missing or out of range.
    #[error("{0}")]
    InvalidArguments(String),

    /// No adapter operation exists for the tool name.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

impl From<reqwest::Error> for FdaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Session store failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Another turn is already running for this session.
    #[error("session {id} is busy with another request")]
    Busy {
        /// Session id.
        id: String,
    },

    /// No session exists with this id.
    #[error("session {id} not found")]
    NotFound {
        /// Session id.
        id: String,
    },

    /// The supplied id is not a valid session identifier.
    #[error("invalid session id: {reason}")]
    InvalidId {
        /// Why the id was rejected.
        reason: String,
    },
}

/// CLI command failures.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command could not complete.
    #[error("{0}")]
    ExecutionFailed(String),
}
