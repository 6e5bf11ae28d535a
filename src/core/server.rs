//! MCP Server implementation and lifecycle management.
//!
//! [`McpServer`] owns the dispatcher for the configured toolset and answers
//! the MCP tool methods. Every call, successful or not, produces a
//! `CallToolResult` envelope; protocol-level errors are never returned for
//! tool failures.

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, model::*, service::RequestContext,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::config::Config;
use super::error::Result;
use super::services::{CommandRunner, DryRunRunner, SystemCommandRunner};
use crate::domains::tools::{Dispatcher, ToolContext, build_registry};

/// The main MCP server handler.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Routes tool calls to the registry of the configured toolset.
    dispatcher: Dispatcher,
}

impl McpServer {
    /// Create a server for `config.toolset`.
    ///
    /// Fails when the toolset's handlers cannot be built (missing
    /// credentials, HTTP client construction).
    pub fn new(config: Config) -> Result<Self> {
        let runner: Arc<dyn CommandRunner> = if config.runtime.dry_run {
            info!("Dry-run mode: local commands are logged, not executed");
            Arc::new(DryRunRunner::new())
        } else {
            Arc::new(SystemCommandRunner::new(config.runtime.command_timeout()))
        };
        Self::with_runner(config, runner)
    }

    /// Create a server with an explicit command runner.
    pub fn with_runner(config: Config, runner: Arc<dyn CommandRunner>) -> Result<Self> {
        let config = Arc::new(config);
        let context = ToolContext::new(config.clone(), runner)?;
        let registry = build_registry(config.toolset, &context)?;

        Ok(Self {
            dispatcher: Dispatcher::new(Arc::new(registry)),
            config,
        })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Instructions reported to clients during initialization.
    pub fn instructions(&self) -> &'static str {
        self.config.toolset.description()
    }

    // ========================================================================
    // HTTP Transport Support Methods
    // ========================================================================

    /// Tool descriptors as JSON (for HTTP transport).
    pub fn list_tools_json(&self) -> Vec<serde_json::Value> {
        self.dispatcher
            .list_tools()
            .into_iter()
            .filter_map(|t| serde_json::to_value(t).ok())
            .collect()
    }

    /// Call a tool with raw JSON arguments (for HTTP transport).
    ///
    /// Always returns an envelope; failures are flagged with `isError`.
    pub async fn call_tool_json(
        &self,
        name: &str,
        arguments: Option<serde_json::Value>,
    ) -> serde_json::Value {
        let result = self.dispatcher.dispatch_value(name, arguments).await;
        serde_json::to_value(result).unwrap_or_else(|e| {
            serde_json::json!({
                "content": [{"type": "text", "text": format!("failed to encode result: {}", e)}],
                "isError": true
            })
        })
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(self.instructions().to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.config.server.name.clone(),
                version: self.config.server.version.clone(),
                ..Implementation::from_build_env()
            },
            ..Default::default()
        }
    }

    #[instrument(skip(self, _request, _context))]
    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, McpError> {
        info!("Listing tools");
        Ok(ListToolsResult {
            tools: self.dispatcher.list_tools(),
            next_cursor: None,
            meta: None,
        })
    }

    #[instrument(skip(self, request, _context), fields(tool = %request.name))]
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, McpError> {
        Ok(self
            .dispatcher
            .dispatch(&request.name, request.arguments)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::Toolset;

    fn server(toolset: Toolset) -> McpServer {
        McpServer::with_runner(Config::for_toolset(toolset), Arc::new(DryRunRunner::new()))
            .unwrap()
    }

    #[test]
    fn test_info_reports_toolset() {
        let server = server(Toolset::Web);
        let info = server.get_info();
        assert_eq!(info.server_info.name, "mcp-web");
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_none());
        assert_eq!(info.instructions.as_deref(), Some(Toolset::Web.description()));
    }

    #[test]
    fn test_missing_credentials_fail_construction() {
        let result = McpServer::with_runner(
            Config::for_toolset(Toolset::IpQuery),
            Arc::new(DryRunRunner::new()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_list_tools_json_uses_protocol_field_names() {
        let tools = server(Toolset::Power).list_tools_json();
        assert_eq!(tools.len(), 8);
        assert_eq!(tools[0]["name"], "shutdown_system");
        assert!(tools[0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn test_call_tool_json_unknown_tool() {
        let result = server(Toolset::Web)
            .call_tool_json("nope", Some(serde_json::json!({})))
            .await;
        assert_eq!(result["isError"], true);
        assert_eq!(result["structuredContent"]["error"]["kind"], "method_not_found");
    }
}
