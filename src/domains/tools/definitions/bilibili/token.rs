use async_trait::async_trait;
use chrono::Utc;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::core::services::TokenCache;
use crate::domains::tools::{ToolError, ToolHandler, describe, parse_params, structured_result};

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct CheckLocalTokenParams {}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct LocalTokenStatus {
    pub has_valid_token: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Unix seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub message: String,
}

/// Reports whether the token cache holds a usable access token.
pub struct CheckLocalTokenTool {
    cache: TokenCache,
}

impl CheckLocalTokenTool {
    pub const NAME: &'static str = "bilibili_check_local_token";

    pub const DESCRIPTION: &'static str = "Check whether a valid Bilibili access token is cached locally. If not, authorize with bilibili_web_authorize_link.";

    pub fn new(cache: TokenCache) -> Self {
        Self { cache }
    }

    pub fn status(&self) -> LocalTokenStatus {
        match self.cache.load() {
            Some(token) if token.is_valid_at(Utc::now()) => LocalTokenStatus {
                has_valid_token: true,
                message: "A valid access token is cached".to_string(),
                access_token: Some(token.access_token),
                refresh_token: Some(token.refresh_token),
                expires_at: Some(token.expires_at),
            },
            Some(token) => LocalTokenStatus {
                has_valid_token: false,
                access_token: None,
                refresh_token: None,
                expires_at: Some(token.expires_at),
                message: "The cached access token has expired; refresh it with bilibili_refresh_token or authorize again".to_string(),
            },
            None => LocalTokenStatus {
                has_valid_token: false,
                access_token: None,
                refresh_token: None,
                expires_at: None,
                message: "No cached token; authorize with bilibili_web_authorize_link".to_string(),
            },
        }
    }
}

#[async_trait]
impl ToolHandler for CheckLocalTokenTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<CheckLocalTokenParams, LocalTokenStatus>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let _: CheckLocalTokenParams = parse_params(arguments)?;
        let status = self.status();
        structured_result(status.message.clone(), &status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::services::StoredToken;

    #[tokio::test]
    async fn test_reports_missing_valid_and_expired() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("token.json"));
        let tool = CheckLocalTokenTool::new(cache.clone());

        let missing = tool.call(JsonObject::new()).await.unwrap();
        let data = missing.structured_content.unwrap();
        assert_eq!(data["has_valid_token"], false);
        assert!(data.get("expires_at").is_none());

        cache
            .save(&StoredToken::from_grant("at", "rt", 3600, Utc::now()))
            .unwrap();
        let valid = tool.status();
        assert!(valid.has_valid_token);
        assert_eq!(valid.access_token.as_deref(), Some("at"));

        cache
            .save(&StoredToken::from_grant("at", "rt", 0, Utc::now()))
            .unwrap();
        let expired = tool.status();
        assert!(!expired.has_valid_token);
        assert!(expired.access_token.is_none());
        assert!(expired.expires_at.is_some());
    }
}
