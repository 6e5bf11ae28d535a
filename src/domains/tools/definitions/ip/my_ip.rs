//! Public IP lookup.

use async_trait::async_trait;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::core::services::HttpClient;
use crate::domains::tools::{ToolError, ToolHandler, describe, parse_params, structured_result};

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct GetMyIpParams {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct MyIp {
    /// Public IP address of this machine.
    pub ip: String,
}

/// `{success, code, msg, data}` returned by the echo service.
#[derive(Debug, Deserialize)]
struct EchoResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<String>,
}

pub struct GetMyIpTool {
    http: HttpClient,
    url: String,
}

impl GetMyIpTool {
    pub const NAME: &'static str = "get_my_ip";

    pub const DESCRIPTION: &'static str = "Get the public IP address of the current machine.";

    pub fn new(http: HttpClient, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    #[instrument(skip_all)]
    pub async fn execute(&self) -> Result<MyIp, ToolError> {
        let response: EchoResponse = self.http.send_json(self.http.client().get(&self.url)).await?;

        match response {
            EchoResponse {
                success: true,
                code: 200,
                data: Some(ip),
                ..
            } if !ip.trim().is_empty() => {
                info!(ip = %ip, "Public IP resolved");
                Ok(MyIp {
                    ip: ip.trim().to_string(),
                })
            }
            other => Err(ToolError::upstream(format!(
                "IP service returned code {}: {}",
                other.code,
                other.msg.unwrap_or_else(|| "no address in response".to_string())
            ))),
        }
    }
}

#[async_trait]
impl ToolHandler for GetMyIpTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<GetMyIpParams, MyIp>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let _: GetMyIpParams = parse_params(arguments)?;
        let ip = self.execute().await?;
        structured_result(format!("Public IP: {}", ip.ip), &ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use serde_json::json;
    use std::time::Duration;

    fn tool(server: &MockServer) -> GetMyIpTool {
        GetMyIpTool::new(
            HttpClient::new(Duration::from_secs(5)).unwrap(),
            server.url("/getIP"),
        )
    }

    #[tokio::test]
    async fn test_returns_ip() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/getIP");
            then.status(200)
                .json_body(json!({"success": true, "code": 200, "msg": "ok", "data": "203.0.113.7"}));
        });

        let result = tool(&server).call(JsonObject::new()).await.unwrap();
        assert_eq!(result.structured_content.unwrap()["ip"], "203.0.113.7");
    }

    #[tokio::test]
    async fn test_provider_failure_is_upstream_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/getIP");
            then.status(200)
                .json_body(json!({"success": false, "code": 429, "msg": "rate limited"}));
        });

        let err = tool(&server).execute().await.unwrap_err();
        assert!(matches!(err, ToolError::Upstream(_)));
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("rate limited"));
    }
}
