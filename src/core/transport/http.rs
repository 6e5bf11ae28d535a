//! HTTP transport implementation.
//!
//! Stateless JSON-RPC over POST, so plain HTTP clients (curl, scripts) can
//! list and call tools. Only `initialize`, `tools/list`, `tools/call` and
//! notifications are understood.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument, warn};

use super::{TransportError, TransportResult, config::HttpConfig};
use crate::core::McpServer;

/// Protocol version reported by `initialize`.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

/// JSON-RPC request structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
}

/// JSON-RPC response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<serde_json::Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    pub fn method_not_found(id: Option<serde_json::Value>, method: &str) -> Self {
        Self::error(id, -32601, format!("Method not found: {}", method))
    }

    pub fn invalid_request(id: Option<serde_json::Value>) -> Self {
        Self::error(id, -32600, "Invalid Request")
    }

    pub fn invalid_params(id: Option<serde_json::Value>, msg: impl Into<String>) -> Self {
        Self::error(id, -32602, msg)
    }
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Build the router without binding, so it can be exercised in tests.
    pub fn router(&self, server: McpServer) -> Router {
        let mut app = Router::new()
            .route(&self.config.rpc_path, post(handle_rpc))
            .route("/health", get(health_check))
            .with_state(server)
            .layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            app = app.layer(cors);
        }
        app
    }

    /// Run the HTTP transport.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let addr = self.address();
        let app = self.router(server);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        info!(
            "Ready - listening on {} (JSON-RPC over HTTP, CORS {})",
            addr,
            if self.config.enable_cors {
                "enabled"
            } else {
                "disabled"
            }
        );
        info!("  → JSON-RPC: POST {}", self.config.rpc_path);
        info!("  → Health:   GET /health");

        axum::serve(listener, app)
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        Ok(())
    }
}

/// Health check endpoint.
async fn health_check(State(server): State<McpServer>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "server": server.name(),
        "toolset": server.config().toolset,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Handle JSON-RPC requests.
#[instrument(skip_all, fields(method))]
async fn handle_rpc(
    State(server): State<McpServer>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    tracing::Span::current().record("method", request.method.as_str());
    debug!("Received JSON-RPC request");
    let response = process_request(&server, request).await;
    (StatusCode::OK, Json(response))
}

/// Process a JSON-RPC request and return the response.
pub async fn process_request(server: &McpServer, request: JsonRpcRequest) -> JsonRpcResponse {
    if request.jsonrpc != "2.0" {
        return JsonRpcResponse::invalid_request(request.id);
    }

    let method = request.method.clone();
    match method.as_str() {
        "initialize" => JsonRpcResponse::success(
            request.id,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": server.name(),
                    "version": server.version()
                },
                "instructions": server.instructions()
            }),
        ),

        "tools/list" => JsonRpcResponse::success(
            request.id,
            serde_json::json!({ "tools": server.list_tools_json() }),
        ),

        "tools/call" => handle_tools_call(server, request).await,

        method if method.starts_with("notifications/") => {
            debug!("Notification acknowledged");
            JsonRpcResponse::success(request.id, serde_json::Value::Null)
        }

        method => {
            warn!("Unknown method: {}", method);
            JsonRpcResponse::method_not_found(request.id, method)
        }
    }
}

async fn handle_tools_call(server: &McpServer, request: JsonRpcRequest) -> JsonRpcResponse {
    let Some(params) = request.params else {
        return JsonRpcResponse::invalid_params(request.id, "Missing params");
    };

    let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
        return JsonRpcResponse::invalid_params(request.id, "Missing tool name");
    };

    // Tool failures are envelopes inside a successful response.
    let result = server
        .call_tool_json(name, params.get("arguments").cloned())
        .await;
    JsonRpcResponse::success(request.id, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::core::services::DryRunRunner;
    use crate::domains::tools::Toolset;
    use serde_json::json;
    use std::sync::Arc;

    fn server() -> McpServer {
        McpServer::with_runner(
            Config::for_toolset(Toolset::Web),
            Arc::new(DryRunRunner::new()),
        )
        .unwrap()
    }

    fn request(method: &str, params: serde_json::Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(json!(1)),
            method: method.to_string(),
            params: Some(params),
        }
    }

    #[tokio::test]
    async fn test_initialize_reports_tools_only() {
        let response = process_request(&server(), request("initialize", json!({}))).await;
        let result = response.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], "mcp-web");
        assert!(result["capabilities"].get("resources").is_none());
    }

    #[tokio::test]
    async fn test_tools_list_and_call() {
        let server = server();
        let list = process_request(&server, request("tools/list", json!({}))).await;
        let tools = list.result.unwrap()["tools"].clone();
        assert_eq!(tools[0]["name"], "open_web");

        let call = process_request(
            &server,
            request(
                "tools/call",
                json!({"name": "web_search", "arguments": {"query": "rust"}}),
            ),
        )
        .await;
        let result = call.result.unwrap();
        assert_eq!(result["isError"], false);
    }

    #[tokio::test]
    async fn test_tool_failures_are_envelopes() {
        let server = server();
        let call = process_request(
            &server,
            request("tools/call", json!({"name": "open_web", "arguments": [1, 2]})),
        )
        .await;
        assert!(call.error.is_none());
        let result = call.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["structuredContent"]["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_unknown_method_and_bad_version() {
        let server = server();
        let response = process_request(&server, request("resources/list", json!({}))).await;
        assert_eq!(response.error.unwrap().code, -32601);

        let mut bad = request("tools/list", json!({}));
        bad.jsonrpc = "1.0".to_string();
        assert_eq!(process_request(&server, bad).await.error.unwrap().code, -32600);
    }
}
