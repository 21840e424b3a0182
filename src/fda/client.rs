//! HTTP client for `api.fda.gov`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::query::{FdaQuery, FdaRequest, filter_updated_within};
use super::{AdapterResponse, DataSource};
use crate::error::FdaError;

/// Public openFDA API.
pub const DEFAULT_BASE_URL: &str = "https://api.fda.gov";
/// Per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for [`OpenFdaClient`].
#[derive(Debug, Clone)]
pub struct FdaConfig {
    /// API root, without trailing slash.
    pub base_url: String,
    /// Optional openFDA API key, sent as the `api_key` query parameter.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for FdaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl FdaConfig {
    /// Reads `OPENFDA_BASE_URL`, `OPENFDA_API_KEY` (or
    /// `OPENFDA_DRUG_API_KEY`) and `OPENFDA_TIMEOUT_SECS`.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: non_empty_env("OPENFDA_BASE_URL").unwrap_or(defaults.base_url),
            api_key: non_empty_env("OPENFDA_API_KEY")
                .or_else(|| non_empty_env("OPENFDA_DRUG_API_KEY")),
            timeout: non_empty_env("OPENFDA_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map_or(defaults.timeout, Duration::from_secs),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// [`DataSource`] backed by the openFDA REST API.
#[derive(Debug, Clone)]
pub struct OpenFdaClient {
    http: reqwest::Client,
    config: FdaConfig,
}

impl OpenFdaClient {
    /// Builds a client with the given settings.
    ///
    /// # Errors
    ///
    /// Returns [`FdaError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: FdaConfig) -> Result<Self, FdaError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("openfda-chat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FdaError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Sends `query` and returns the raw `results` array.
    ///
    /// A 404 means "no matches" to openFDA and yields an empty list.
    pub async fn fetch(&self, query: &FdaQuery) -> Result<Vec<Value>, FdaError> {
        let url = format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            query.endpoint.path()
        );

        let mut params = vec![("limit", query.limit.to_string())];
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }
        if let Some(key) = &self.config.api_key {
            params.push(("api_key", key.clone()));
        }

        debug!(url = %url, search = ?query.search, limit = query.limit, "openFDA request");
        let response = self.http.get(&url).query(&params).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(FdaError::Status {
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await?;
        let results = match body {
            Value::Object(mut map) => map.remove("results"),
            _ => return Err(FdaError::Malformed("expected a JSON object".to_string())),
        };
        match results {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(FdaError::Malformed("'results' is not an array".to_string())),
        }
    }

    async fn run(&self, tool: &str, args: &Map<String, Value>) -> Result<Value, FdaError> {
        let query = FdaRequest::parse(tool, args)?.to_query(Local::now().date_naive())?;
        let mut results = self.fetch(&query).await?;
        if let Some(window) = query.updated_within {
            results = filter_updated_within(results, window);
        }
        Ok(Value::Array(results))
    }
}

#[async_trait]
impl DataSource for OpenFdaClient {
    async fn call(&self, tool: &str, args: &Map<String, Value>) -> AdapterResponse {
        match self.run(tool, args).await {
            Ok(data) => AdapterResponse::ok(data),
            Err(e) => {
                warn!(tool, error = %e, "openFDA lookup failed");
                e.into()
            }
        }
    }

    async fn health_check(&self) -> Result<(), FdaError> {
        let probe = FdaQuery {
            endpoint: super::Endpoint::Labels,
            search: None,
            limit: 1,
            updated_within: None,
        };
        self.fetch(&probe).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FdaConfig::default();
        assert_eq!(config.base_url, "https://api.fda.gov");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.api_key.is_none());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_failure_data() {
        let client = OpenFdaClient::new(FdaConfig::default()).unwrap_or_else(|_| unreachable!());
        let resp = client.call("drop_tables", &Map::new()).await;
        assert!(!resp.success);
        assert_eq!(resp.data, Value::Null);
        assert_eq!(resp.error.as_deref(), Some("unknown tool: drop_tables"));
    }

    #[tokio::test]
    async fn test_invalid_classification_never_hits_network() {
        let config = FdaConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..FdaConfig::default()
        };
        let client = OpenFdaClient::new(config).unwrap_or_else(|_| unreachable!());
        let mut args = Map::new();
        args.insert("classification".into(), Value::from("Class IV"));
        let resp = client.call("get_recalls_by_classification", &args).await;
        assert_eq!(
            resp.error.as_deref(),
            Some("Invalid classification. Must be one of: Class I, Class II, Class III")
        );
    }
}
