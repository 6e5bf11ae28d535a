//! Open a web page in the default browser.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::core::services::CommandRunner;
use crate::domains::tools::{
    ToolError, ToolHandler, describe, parse_params, require_non_empty, structured_result,
};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct OpenWebParams {
    /// Address to open; `https://` is added when no scheme is given.
    pub url: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct OpenedPage {
    /// The normalized URL handed to the browser.
    pub url: String,
}

/// Prefix `https://` unless the input already names http or https, then
/// validate. Other schemes are rejected.
pub fn normalize_url(input: &str) -> Result<Url, ToolError> {
    let input = require_non_empty("url", input)?;
    let lower = input.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        input.to_string()
    } else if let Some((scheme, _)) = input.split_once("://") {
        return Err(ToolError::invalid_arguments(format!(
            "unsupported scheme '{}', expected http or https",
            scheme
        )));
    } else {
        format!("https://{}", input)
    };

    let url = Url::parse(&candidate)
        .map_err(|e| ToolError::invalid_arguments(format!("invalid URL '{}': {}", input, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ToolError::invalid_arguments(format!(
            "invalid URL '{}'",
            input
        )));
    }
    Ok(url)
}

pub struct OpenWebTool {
    runner: Arc<dyn CommandRunner>,
}

impl OpenWebTool {
    pub const NAME: &'static str = "open_web";

    pub const DESCRIPTION: &'static str =
        "Open a URL in the system's default browser. https:// is added when missing.";

    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    #[instrument(skip_all, fields(url = %params.url))]
    pub async fn execute(&self, params: OpenWebParams) -> Result<OpenedPage, ToolError> {
        let url = normalize_url(&params.url)?;
        self.runner.open_url(url.as_str()).await?;
        info!("Opened {}", url);
        Ok(OpenedPage {
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl ToolHandler for OpenWebTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<OpenWebParams, OpenedPage>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let params: OpenWebParams = parse_params(arguments)?;
        let page = self.execute(params).await?;
        structured_result(format!("Opened in the default browser: {}", page.url), &page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::services::DryRunRunner;
    use serde_json::json;

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("example.com/docs").unwrap().as_str(),
            "https://example.com/docs"
        );
        assert_eq!(
            normalize_url("HTTP://example.com").unwrap().as_str(),
            "http://example.com/"
        );
        assert!(normalize_url("").is_err());
        assert!(normalize_url("not a url").is_err());
        assert!(normalize_url("ftp://example.com").is_err());
    }

    #[tokio::test]
    async fn test_opens_browser() {
        let runner = Arc::new(DryRunRunner::new());
        let tool = OpenWebTool::new(runner.clone());

        let result = tool
            .call(json!({"url": "rust-lang.org"}).as_object().cloned().unwrap())
            .await
            .unwrap();

        assert_eq!(result.structured_content.unwrap()["url"], "https://rust-lang.org/");
        let commands = runner.commands();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].args.iter().any(|a| a == "https://rust-lang.org/"));
    }

    #[tokio::test]
    async fn test_invalid_url_does_not_open() {
        let runner = Arc::new(DryRunRunner::new());
        let tool = OpenWebTool::new(runner.clone());

        let err = tool
            .call(json!({"url": "   "}).as_object().cloned().unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert!(runner.commands().is_empty());
    }
}
