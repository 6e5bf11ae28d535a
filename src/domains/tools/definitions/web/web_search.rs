//! Search engine redirection: build a results URL and open it.

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

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    #[default]
    Baidu,
    Google,
    Bing,
    Sogou,
    So360,
}

impl SearchEngine {
    pub fn display_name(&self) -> &'static str {
        match self {
            SearchEngine::Baidu => "Baidu",
            SearchEngine::Google => "Google",
            SearchEngine::Bing => "Bing",
            SearchEngine::Sogou => "Sogou",
            SearchEngine::So360 => "360 Search",
        }
    }

    /// Results page and the query parameter it reads.
    fn endpoint(&self) -> (&'static str, &'static str) {
        match self {
            SearchEngine::Baidu => ("https://baidu.com/s", "wd"),
            SearchEngine::Google => ("https://www.google.com/search", "q"),
            SearchEngine::Bing => ("https://www.bing.com/search", "q"),
            SearchEngine::Sogou => ("https://www.sogou.com/web", "query"),
            SearchEngine::So360 => ("https://www.so.com/s", "q"),
        }
    }

    pub fn search_url(&self, query: &str) -> Result<Url, ToolError> {
        let (base, param) = self.endpoint();
        Url::parse_with_params(base, [(param, query)])
            .map_err(|e| ToolError::internal(format!("failed to build search URL: {}", e)))
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct WebSearchParams {
    /// Keywords to search for.
    pub query: String,

    /// Search engine: baidu (default), google, bing, sogou or so360.
    #[serde(default)]
    pub engine: SearchEngine,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SearchOpened {
    pub engine: SearchEngine,
    pub query: String,
    pub url: String,
}

pub struct WebSearchTool {
    runner: Arc<dyn CommandRunner>,
}

impl WebSearchTool {
    pub const NAME: &'static str = "web_search";

    pub const DESCRIPTION: &'static str = "Search for keywords with a search engine (baidu, google, bing, sogou or so360) and open the results in the default browser.";

    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    #[instrument(skip_all, fields(engine = ?params.engine))]
    pub async fn execute(&self, params: WebSearchParams) -> Result<SearchOpened, ToolError> {
        let query = require_non_empty("query", &params.query)?;
        let url = params.engine.search_url(query)?;
        self.runner.open_url(url.as_str()).await?;
        info!("Opened search results");
        Ok(SearchOpened {
            engine: params.engine,
            query: query.to_string(),
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl ToolHandler for WebSearchTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<WebSearchParams, SearchOpened>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let params: WebSearchParams = parse_params(arguments)?;
        let opened = self.execute(params).await?;
        let summary = format!(
            "Searched {} for \"{}\": {}",
            opened.engine.display_name(),
            opened.query,
            opened.url
        );
        structured_result(summary, &opened)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::services::DryRunRunner;
    use serde_json::json;

    fn args(value: serde_json::Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_search_urls() {
        assert_eq!(
            SearchEngine::Baidu.search_url("rust").unwrap().as_str(),
            "https://baidu.com/s?wd=rust"
        );
        assert_eq!(
            SearchEngine::Sogou.search_url("a b").unwrap().as_str(),
            "https://www.sogou.com/web?query=a+b"
        );
        let url = SearchEngine::Google.search_url("天气").unwrap();
        assert_eq!(url.query_pairs().next().unwrap().1, "天气");
    }

    #[tokio::test]
    async fn test_default_engine_is_baidu() {
        let runner = Arc::new(DryRunRunner::new());
        let result = WebSearchTool::new(runner.clone())
            .call(args(json!({"query": "tokio"})))
            .await
            .unwrap();

        let data = result.structured_content.unwrap();
        assert_eq!(data["engine"], "baidu");
        assert_eq!(runner.commands().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_engine_is_invalid_params() {
        let runner = Arc::new(DryRunRunner::new());
        let err = WebSearchTool::new(runner.clone())
            .call(args(json!({"query": "tokio", "engine": "altavista"})))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert!(runner.commands().is_empty());
    }
}
