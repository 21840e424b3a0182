//! Data source adapter for the openFDA drug APIs.
//!
//! The orchestration loop only sees the [`DataSource`] trait: a tool name
//! and its arguments go in, an [`AdapterResponse`] comes out. Failures are
//! data, never errors, so the reasoning engine can explain them.

pub mod client;
pub mod params;
pub mod query;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FdaError;

pub use client::{FdaConfig, OpenFdaClient};
pub use query::{Endpoint, FdaQuery, FdaRequest};

/// Result of one adapter operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterResponse {
    /// Whether the lookup succeeded.
    pub success: bool,
    /// Upstream results; `null` on failure.
    pub data: Value,
    /// Failure description.
    pub error: Option<String>,
}

impl AdapterResponse {
    /// A successful lookup carrying `data`.
    #[must_use]
    pub const fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    /// A failed lookup.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(error.into()),
        }
    }

    /// Serializes the response for a tool-result message.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"success":false,"data":null,"error":"unserializable result: {e}"}}"#)
        })
    }
}

impl From<FdaError> for AdapterResponse {
    fn from(err: FdaError) -> Self {
        Self::failure(err.to_string())
    }
}

/// Executes named tool calls against an external data source.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Runs `tool` with `args`. Never fails; failures are reported in the
    /// response.
    async fn call(&self, tool: &str, args: &Map<String, Value>) -> AdapterResponse;

    /// Checks that the upstream API is reachable.
    async fn health_check(&self) -> Result<(), FdaError>;
}
