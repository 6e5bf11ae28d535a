//! Browser-assisted geolocation.
//!
//! The tool opens a consent page tagged with a fresh key; once the user
//! allows location access, the page publishes the coordinates under that key
//! and the tool picks them up by polling.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use rmcp::model::{CallToolResult, JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::core::services::{CommandRunner, HttpClient, PollPolicy, PollStatus, poll_until};
use crate::domains::tools::{ToolError, ToolHandler, describe, parse_params, structured_result};

/// The tool takes no arguments.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct GetLocationParams {}

/// Coordinates reported by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
struct CoordinatesResponse {
    code: i64,
    #[serde(default)]
    data: Option<Coordinates>,
    #[serde(default)]
    msg: Option<String>,
}

/// Endpoints used by the tool.
#[derive(Debug, Clone)]
pub struct LocationEndpoints {
    /// Consent page opened in the browser.
    pub page_url: String,
    /// Endpoint returning the coordinates published for a key.
    pub api_url: String,
}

pub struct GetLocationTool {
    http: HttpClient,
    runner: Arc<dyn CommandRunner>,
    endpoints: LocationEndpoints,
    poll: PollPolicy,
}

impl GetLocationTool {
    pub const NAME: &'static str = "get_location";

    pub const DESCRIPTION: &'static str = "Get the user's location (latitude and longitude). Opens a page in the browser where the user grants location access, then waits for the coordinates.";

    pub fn new(
        http: HttpClient,
        runner: Arc<dyn CommandRunner>,
        endpoints: LocationEndpoints,
        poll: PollPolicy,
    ) -> Self {
        Self {
            http,
            runner,
            endpoints,
            poll,
        }
    }

    #[instrument(skip_all)]
    pub async fn execute(&self) -> Result<Coordinates, ToolError> {
        let key = Uuid::new_v4().to_string();
        let page_url = with_key(&self.endpoints.page_url, &key)?;
        let api_url = with_key(&self.endpoints.api_url, &key)?;

        info!(key = %key, "Opening location consent page");
        if let Err(e) = self.runner.open_url(page_url.as_str()).await {
            return Err(ToolError::upstream(format!(
                "failed to open the browser ({}), please visit {} manually",
                e, page_url
            )));
        }

        poll_until(self.poll, "location", |attempt| {
            let api_url = api_url.clone();
            async move { self.check_once(api_url, attempt).await }
        })
        .await
    }

    async fn check_once(&self, url: Url, attempt: u32) -> PollStatus<Coordinates> {
        let response = match self.http.send(self.http.client().get(url)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(attempt, "Location request failed: {}", e);
                return PollStatus::Pending;
            }
        };

        // 404 means the page has not published anything yet.
        if response.status == StatusCode::NOT_FOUND {
            return PollStatus::Pending;
        }
        if !response.is_success() {
            warn!(attempt, status = response.status.as_u16(), "Location endpoint error");
            return PollStatus::Pending;
        }

        match response.json::<CoordinatesResponse>() {
            Ok(CoordinatesResponse {
                code: 0,
                data: Some(coordinates),
                ..
            }) => PollStatus::Ready(coordinates),
            Ok(other) => {
                debug!(attempt, code = other.code, msg = ?other.msg, "Location not ready");
                PollStatus::Pending
            }
            Err(e) => {
                warn!(attempt, "Unexpected location response: {}", e);
                PollStatus::Pending
            }
        }
    }
}

fn with_key(base: &str, key: &str) -> Result<Url, ToolError> {
    Url::parse_with_params(base, [("key", key)])
        .map_err(|e| ToolError::internal(format!("invalid endpoint '{}': {}", base, e)))
}

#[async_trait]
impl ToolHandler for GetLocationTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<GetLocationParams, Coordinates>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let _: GetLocationParams = parse_params(arguments)?;
        let coordinates = self.execute().await?;
        structured_result(
            format!(
                "Latitude {}, longitude {}",
                coordinates.latitude, coordinates.longitude
            ),
            &coordinates,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::services::DryRunRunner;
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use serde_json::json;
    use std::time::Duration;

    fn tool(server: &MockServer, runner: Arc<DryRunRunner>, attempts: u32) -> GetLocationTool {
        GetLocationTool::new(
            HttpClient::new(Duration::from_secs(5)).unwrap(),
            runner,
            LocationEndpoints {
                page_url: server.url("/page"),
                api_url: server.url("/coordinates"),
            },
            PollPolicy::new(attempts, Duration::from_millis(10)),
        )
    }

    #[tokio::test]
    async fn test_returns_published_coordinates() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/coordinates").query_param_exists("key");
            then.status(200)
                .json_body(json!({"code": 0, "data": {"latitude": 31.23, "longitude": 121.47}}));
        });
        let runner = Arc::new(DryRunRunner::new());

        let result = tool(&server, runner.clone(), 5)
            .call(JsonObject::new())
            .await
            .unwrap();

        mock.assert();
        let data = result.structured_content.unwrap();
        assert_eq!(data["latitude"], 31.23);
        assert_eq!(data["longitude"], 121.47);

        let opened = runner.commands();
        assert_eq!(opened.len(), 1);
        assert!(
            opened[0]
                .args
                .iter()
                .any(|a| a.contains("/page?key="))
        );
    }

    #[tokio::test]
    async fn test_times_out_after_exact_attempts() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/coordinates");
            then.status(404);
        });

        let err = tool(&server, Arc::new(DryRunRunner::new()), 3)
            .execute()
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::Timeout(_)));
        assert_eq!(mock.hits(), 3);
    }

    #[tokio::test]
    async fn test_non_zero_code_keeps_polling() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/coordinates");
            then.status(200).json_body(json!({"code": 1, "msg": "waiting"}));
        });

        let err = tool(&server, Arc::new(DryRunRunner::new()), 2)
            .execute()
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::Timeout(_)));
        assert_eq!(mock.hits(), 2);
    }
}
