//! IP geolocation through the Aliyun market API.

use std::net::IpAddr;

use async_trait::async_trait;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::core::services::HttpClient;
use crate::domains::tools::{
    ToolError, ToolHandler, describe, parse_params, require_non_empty, structured_result,
};

const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct IpLocationParams {
    /// IPv4 or IPv6 address to look up.
    pub ip: String,
}

/// Geolocation of an address. Fields the provider leaves out read `unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct IpLocation {
    pub ip: String,
    pub country: String,
    pub region: String,
    pub city: String,
    pub isp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_no: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<QueryData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    nation: Option<String>,
    province: Option<String>,
    city: Option<String>,
    isp: Option<String>,
    order_no: Option<String>,
}

fn or_unknown(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

pub struct IpLocationTool {
    http: HttpClient,
    url: String,
    app_code: String,
}

impl std::fmt::Debug for IpLocationTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpLocationTool")
            .field("url", &self.url)
            .field("app_code", &"[REDACTED]")
            .finish()
    }
}

impl IpLocationTool {
    pub const NAME: &'static str = "get_ip_location";

    pub const DESCRIPTION: &'static str = "Look up the geographic location (country, region, city) and ISP of an IP address.";

    pub fn new(http: HttpClient, url: impl Into<String>, app_code: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            app_code: app_code.into(),
        }
    }

    #[instrument(skip_all, fields(ip = %params.ip))]
    pub async fn execute(&self, params: IpLocationParams) -> Result<IpLocation, ToolError> {
        let raw = require_non_empty("ip", &params.ip)?;
        let ip: IpAddr = raw
            .parse()
            .map_err(|_| ToolError::invalid_arguments(format!("'{}' is not an IP address", raw)))?;
        let ip = ip.to_string();

        let request = self
            .http
            .client()
            .get(&self.url)
            .query(&[("ip", ip.as_str())])
            .header("Authorization", format!("APPCODE {}", self.app_code));
        let response: QueryResponse = self.http.send_json(request).await?;

        if response.success == Some(false) {
            return Err(ToolError::upstream(format!(
                "IP location service returned code {}: {}",
                response.code.unwrap_or_default(),
                response.msg.unwrap_or_default()
            )));
        }

        let data = response.data.unwrap_or_default();
        let location = IpLocation {
            ip,
            country: or_unknown(data.nation),
            region: or_unknown(data.province),
            city: or_unknown(data.city),
            isp: or_unknown(data.isp),
            order_no: data.order_no,
        };
        info!(country = %location.country, city = %location.city, "IP located");
        Ok(location)
    }
}

#[async_trait]
impl ToolHandler for IpLocationTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<IpLocationParams, IpLocation>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let params: IpLocationParams = parse_params(arguments)?;
        let location = self.execute(params).await?;
        let summary = format!(
            "{}: {} / {} / {} ({})",
            location.ip, location.country, location.region, location.city, location.isp
        );
        structured_result(summary, &location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use serde_json::json;
    use std::time::Duration;

    fn tool(server: &MockServer) -> IpLocationTool {
        IpLocationTool::new(
            HttpClient::new(Duration::from_secs(5)).unwrap(),
            server.url("/api/ip/query"),
            "secret-code",
        )
    }

    fn args(value: serde_json::Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_locates_ip_with_appcode() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/ip/query")
                .query_param("ip", "8.8.8.8")
                .header("Authorization", "APPCODE secret-code");
            then.status(200).json_body(json!({
                "success": true,
                "code": 200,
                "msg": "成功",
                "data": {"nation": "美国", "province": "", "city": "Mountain View", "isp": "Google", "orderNo": "42"}
            }));
        });

        let result = tool(&server)
            .call(args(json!({"ip": " 8.8.8.8 "})))
            .await
            .unwrap();

        mock.assert();
        let data = result.structured_content.unwrap();
        assert_eq!(data["country"], "美国");
        assert_eq!(data["region"], UNKNOWN);
        assert_eq!(data["city"], "Mountain View");
        assert_eq!(data["order_no"], "42");
    }

    #[tokio::test]
    async fn test_invalid_ip_makes_no_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/ip/query");
            then.status(200);
        });

        for ip in ["", "999.1.1.1", "example.com"] {
            let err = tool(&server).call(args(json!({"ip": ip}))).await.unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments(_)));
        }
        assert_eq!(mock.hits(), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_is_upstream_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/ip/query");
            then.status(403).body("Invalid AppCode");
        });

        let err = tool(&server)
            .call(args(json!({"ip": "1.1.1.1"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("403"));
    }

    #[test]
    fn test_debug_redacts_app_code() {
        let tool = IpLocationTool::new(
            HttpClient::new(Duration::from_secs(1)).unwrap(),
            "http://localhost",
            "secret-code",
        );
        assert!(!format!("{:?}", tool).contains("secret-code"));
    }
}
