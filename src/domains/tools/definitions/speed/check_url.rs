//! URL reachability check.

use async_trait::async_trait;
use reqwest::Url;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::core::services::HttpClient;
use crate::domains::tools::{
    ToolError, ToolHandler, describe, parse_params, require_non_empty, structured_result,
};

const BODY_EXCERPT_CHARS: usize = 500;

/// Parameters for the URL check.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CheckUrlParams {
    /// Absolute http(s) URL to request.
    pub url: String,
}

/// Outcome of a successful check.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CheckUrlResult {
    pub url: String,
    pub status: u16,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub body_excerpt: String,
}

/// Single GET against a URL, reporting status, latency and a body excerpt.
pub struct CheckUrlTool {
    http: HttpClient,
}

impl CheckUrlTool {
    pub const NAME: &'static str = "check_url";

    pub const DESCRIPTION: &'static str = "Check that a URL is reachable with a single GET request. Returns the HTTP status, latency in milliseconds and the beginning of the response body. Non-2xx responses are reported as errors.";

    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    #[instrument(skip_all, fields(url = %params.url))]
    pub async fn execute(&self, params: CheckUrlParams) -> Result<CheckUrlResult, ToolError> {
        let raw = require_non_empty("url", &params.url)?;
        let url = Url::parse(raw)
            .map_err(|e| ToolError::invalid_arguments(format!("invalid url '{}': {}", raw, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ToolError::invalid_arguments(format!(
                "unsupported scheme '{}', expected http or https",
                url.scheme()
            )));
        }

        info!("Checking URL");
        let response = self
            .http
            .send(self.http.client().get(url.clone()))
            .await?
            .ensure_success()?;

        Ok(CheckUrlResult {
            url: url.to_string(),
            status: response.status.as_u16(),
            latency_ms: response.elapsed.as_millis() as u64,
            content_type: response.content_type.clone(),
            body_excerpt: response.excerpt(BODY_EXCERPT_CHARS),
        })
    }
}

#[async_trait]
impl ToolHandler for CheckUrlTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<CheckUrlParams, CheckUrlResult>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let params: CheckUrlParams = parse_params(arguments)?;
        let result = self.execute(params).await?;
        let summary = format!(
            "{} responded {} in {} ms\n{}",
            result.url, result.status, result.latency_ms, result.body_excerpt
        );
        structured_result(summary, &result)
    }
}
