//! MCP server exposing the openFDA tool catalogue.
//!
//! Each MCP tool forwards its typed parameters to the same [`DataSource`]
//! the chat orchestrator uses and returns the adapter response as JSON
//! text. Adapter failures are returned as tool errors carrying the same
//! `{success, data, error}` body.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use serde::Serialize;
use serde_json::Value;

use crate::fda::params::{
    DrugLabelParams, LimitParams, ManufacturerShortagesParams, RecallClassificationParams,
    SearchAdverseEventsParams, SearchDrugLabelsParams, SearchDrugShortagesParams,
    SearchRecallsParams,
};
use crate::fda::{DataSource, FdaConfig, OpenFdaClient};

/// openFDA MCP server.
#[derive(Clone)]
pub struct FdaMcpServer {
    tool_router: ToolRouter<Self>,
    data_source: Arc<dyn DataSource>,
}

impl FdaMcpServer {
    /// Creates a server backed by `data_source`.
    #[must_use]
    pub fn new(data_source: Arc<dyn DataSource>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            data_source,
        }
    }

    /// Creates a server talking to openFDA with settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, crate::error::Error> {
        let client = OpenFdaClient::new(FdaConfig::from_env())?;
        Ok(Self::new(Arc::new(client)))
    }

    async fn dispatch<P: Serialize>(&self, tool: &str, params: &P) -> Result<CallToolResult, McpError> {
        let args = match serde_json::to_value(params)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {e}"), None))?
        {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };

        let response = self.data_source.call(tool, &args).await;
        let body = vec![Content::text(response.to_json_string())];
        Ok(if response.success {
            CallToolResult::success(body)
        } else {
            CallToolResult::error(body)
        })
    }
}

#[tool_router]
impl FdaMcpServer {
    #[tool(
        name = "search_adverse_events",
        description = "Search FDA adverse event (side effect) reports by drug name and/or MedDRA reaction term, optionally only serious events."
    )]
    async fn search_adverse_events(
        &self,
        Parameters(params): Parameters<SearchAdverseEventsParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("search_adverse_events", &params).await
    }

    #[tool(
        name = "get_serious_adverse_events",
        description = "Get serious adverse event reports received in the last 100 days."
    )]
    async fn get_serious_adverse_events(
        &self,
        Parameters(params): Parameters<LimitParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("get_serious_adverse_events", &params).await
    }

    #[tool(
        name = "get_drug_label",
        description = "Get the official FDA product label for a drug by brand or generic name."
    )]
    async fn get_drug_label(
        &self,
        Parameters(params): Parameters<DrugLabelParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("get_drug_label", &params).await
    }

    #[tool(
        name = "search_drug_labels",
        description = "Search drug labels by indication or warning text, manufacturer, or effective date range (YYYYMMDD)."
    )]
    async fn search_drug_labels(
        &self,
        Parameters(params): Parameters<SearchDrugLabelsParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("search_drug_labels", &params).await
    }

    #[tool(
        name = "search_recalls",
        description = "Search drug recalls from the last 100 days by product or company, optionally by risk level (Class I, II or III)."
    )]
    async fn search_recalls(
        &self,
        Parameters(params): Parameters<SearchRecallsParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("search_recalls", &params).await
    }

    #[tool(
        name = "get_recent_drug_recalls",
        description = "Get all drug recalls reported in the last 100 days."
    )]
    async fn get_recent_drug_recalls(
        &self,
        Parameters(params): Parameters<LimitParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("get_recent_drug_recalls", &params).await
    }

    #[tool(
        name = "get_recalls_by_classification",
        description = "Get drug recalls from the last 100 days with a given classification (Class I, Class II or Class III)."
    )]
    async fn get_recalls_by_classification(
        &self,
        Parameters(params): Parameters<RecallClassificationParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("get_recalls_by_classification", &params).await
    }

    #[tool(
        name = "get_critical_recalls",
        description = "Get Class I (serious or life-threatening) drug recalls from the last 100 days."
    )]
    async fn get_critical_recalls(
        &self,
        Parameters(params): Parameters<LimitParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("get_critical_recalls", &params).await
    }

    #[tool(
        name = "search_drug_shortages",
        description = "Search the FDA drug shortage list by drug or company name and/or dosage form."
    )]
    async fn search_drug_shortages(
        &self,
        Parameters(params): Parameters<SearchDrugShortagesParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("search_drug_shortages", &params).await
    }

    #[tool(
        name = "get_current_drug_shortages",
        description = "Get drug shortages updated in the last 100 days."
    )]
    async fn get_current_drug_shortages(
        &self,
        Parameters(params): Parameters<LimitParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("get_current_drug_shortages", &params).await
    }

    #[tool(
        name = "search_shortages_by_manufacturer",
        description = "Get drug shortages reported for a given manufacturer."
    )]
    async fn search_shortages_by_manufacturer(
        &self,
        Parameters(params): Parameters<ManufacturerShortagesParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("search_shortages_by_manufacturer", &params).await
    }
}

#[tool_handler]
impl ServerHandler for FdaMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "openfda-chat".to_string(),
                title: Some("openFDA Drug Data".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: Some("https://open.fda.gov/apis/drug/".to_string()),
            },
            instructions: Some(
                "Live U.S. FDA drug data: adverse events, product labels, recall enforcement \
                 reports and drug shortages. Every tool returns JSON of the form \
                 {success, data, error}."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::error::FdaError;
    use crate::fda::AdapterResponse;
    use async_trait::async_trait;
    use serde_json::{Map, json};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSource {
        seen: Mutex<Vec<(String, Map<String, Value>)>>,
    }

    #[async_trait]
    impl DataSource for RecordingSource {
        async fn call(&self, tool: &str, args: &Map<String, Value>) -> AdapterResponse {
            self.seen
                .lock()
                .unwrap_or_else(|e| panic!("poisoned: {e}"))
                .push((tool.to_string(), args.clone()));
            if tool == "get_drug_label" {
                AdapterResponse::ok(json!([]))
            } else {
                AdapterResponse::failure("Request timed out")
            }
        }

        async fn health_check(&self) -> Result<(), FdaError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_forwards_typed_params() {
        let source = Arc::new(RecordingSource::default());
        let server = FdaMcpServer::new(source.clone());
        let params = DrugLabelParams {
            term: "Lisinopril".to_string(),
            limit: Some(2),
        };
        let result = server
            .dispatch("get_drug_label", &params)
            .await
            .unwrap_or_else(|e| panic!("dispatch: {e:?}"));
        assert_ne!(result.is_error, Some(true));

        let seen = source.seen.lock().unwrap_or_else(|e| panic!("poisoned: {e}"));
        assert_eq!(seen[0].0, "get_drug_label");
        assert_eq!(seen[0].1["term"], "Lisinopril");
        assert_eq!(seen[0].1["limit"], 2);
    }

    #[tokio::test]
    async fn test_adapter_failure_is_tool_error() {
        let server = FdaMcpServer::new(Arc::new(RecordingSource::default()));
        let result = server
            .dispatch("get_critical_recalls", &LimitParams::default())
            .await
            .unwrap_or_else(|e| panic!("dispatch: {e:?}"));
        assert_eq!(result.is_error, Some(true));
    }

    #[test]
    fn test_server_info() {
        let server = FdaMcpServer::new(Arc::new(RecordingSource::default()));
        let info = server.get_info();
        assert_eq!(info.server_info.name, "openfda-chat");
        assert!(info.capabilities.tools.is_some());
    }
}
