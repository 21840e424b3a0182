//! Tool executor that dispatches engine tool calls to the data source.
//!
//! Validates the raw argument payload, checks the tool against the
//! registry, then hands the call to the [`DataSource`]. Every outcome,
//! including rejected arguments, comes back as a finished
//! [`ToolCallRecord`]; nothing here returns an error to the loop.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::tool::{ToolCall, ToolRegistry};
use crate::fda::{AdapterResponse, DataSource};
use crate::session::ToolCallRecord;

/// Maximum raw byte length of tool argument JSON from the engine.
pub const MAX_TOOL_ARGS_LEN: usize = 100_000;

/// Failure payload for arguments that are not a JSON object.
pub const INVALID_ARGUMENTS: &str = "Invalid JSON arguments";

/// Parses the engine's argument string into a JSON object.
///
/// An empty string counts as `{}`.
///
/// # Errors
///
/// Returns a user-facing message when the payload is oversized, is not
/// valid JSON, or is not an object.
pub fn parse_arguments(raw: &str) -> Result<Map<String, Value>, String> {
    if raw.len() > MAX_TOOL_ARGS_LEN {
        return Err(format!(
            "Tool arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
            raw.len()
        ));
    }
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(INVALID_ARGUMENTS.to_string()),
    }
}

/// Runs tool calls against a [`DataSource`].
#[derive(Clone)]
pub struct ToolExecutor {
    data_source: Arc<dyn DataSource>,
    registry: Arc<ToolRegistry>,
}

impl ToolExecutor {
    /// Creates an executor for the tools in `registry`.
    #[must_use]
    pub fn new(data_source: Arc<dyn DataSource>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            data_source,
            registry,
        }
    }

    /// Executes one call and returns its finished record.
    ///
    /// The record's `result` is the serialized [`AdapterResponse`].
    pub async fn execute(&self, call: &ToolCall) -> ToolCallRecord {
        let (arguments, response) = match parse_arguments(&call.arguments) {
            Err(message) => {
                warn!(tool = %call.name, call_id = %call.id, %message, "rejected tool arguments");
                (Map::new(), AdapterResponse::failure(message))
            }
            Ok(arguments) if self.registry.get(&call.name).is_none() => {
                warn!(tool = %call.name, "engine requested an unregistered tool");
                let response = AdapterResponse::failure(format!("unknown tool: {}", call.name));
                (arguments, response)
            }
            Ok(arguments) => {
                let response = self.data_source.call(&call.name, &arguments).await;
                (arguments, response)
            }
        };

        debug!(
            tool = %call.name,
            call_id = %call.id,
            success = response.success,
            "tool execution complete"
        );

        let success = response.success;
        let result = serde_json::to_value(&response).unwrap_or(Value::Null);
        let mut record = ToolCallRecord::pending(call.id.clone(), call.name.clone(), arguments);
        record.finish(result, success);
        record
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::error::FdaError;
    use crate::session::ToolCallStatus;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DataSource for CountingSource {
        async fn call(&self, tool: &str, args: &Map<String, Value>) -> AdapterResponse {
            self.calls.fetch_add(1, Ordering::SeqCst);
            AdapterResponse::ok(json!([{"tool": tool, "args": args}]))
        }

        async fn health_check(&self) -> Result<(), FdaError> {
            Ok(())
        }
    }

    fn executor() -> (ToolExecutor, Arc<CountingSource>) {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let exec = ToolExecutor::new(source.clone(), Arc::new(ToolRegistry::fda()));
        (exec, source)
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_0".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[test]
    fn test_parse_arguments() {
        assert!(parse_arguments("").is_ok_and(|m| m.is_empty()));
        assert_eq!(parse_arguments("[1,2]"), Err(INVALID_ARGUMENTS.to_string()));
        assert_eq!(parse_arguments("{oops"), Err(INVALID_ARGUMENTS.to_string()));
        let big = format!(r#"{{"term":"{}"}}"#, "x".repeat(MAX_TOOL_ARGS_LEN));
        assert!(parse_arguments(&big).is_err_and(|e| e.contains("too large")));
    }

    #[tokio::test]
    async fn test_execute_success() {
        let (exec, source) = executor();
        let record = exec
            .execute(&call("get_drug_label", r#"{"term":"Lisinopril"}"#))
            .await;
        assert_eq!(record.status, ToolCallStatus::Done);
        assert_eq!(record.arguments["term"], "Lisinopril");
        assert_eq!(record.result["success"], true);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_json_never_reaches_source() {
        let (exec, source) = executor();
        let record = exec.execute(&call("get_drug_label", "{not json")).await;
        assert_eq!(record.status, ToolCallStatus::Failed);
        assert_eq!(record.result["error"], INVALID_ARGUMENTS);
        assert_eq!(record.result["data"], Value::Null);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unregistered_tool_fails() {
        let (exec, source) = executor();
        let record = exec.execute(&call("delete_records", "{}")).await;
        assert_eq!(record.status, ToolCallStatus::Failed);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }
}
