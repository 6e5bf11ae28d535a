//! STDIO transport: one MCP session over stdin/stdout.
//!
//! Logs must go to stderr while this transport runs; stdout carries the
//! protocol stream.

use rmcp::ServiceExt;
use tracing::info;

use super::{TransportError, TransportResult};
use crate::core::McpServer;

/// STDIO transport handler.
pub struct StdioTransport;

impl StdioTransport {
    /// Serve until the client closes stdin.
    pub async fn run(server: McpServer) -> TransportResult<()> {
        info!(server = server.name(), "Ready - communicating via stdin/stdout");

        let service = server
            .serve(rmcp::transport::stdio())
            .await
            .map_err(|e| TransportError::init(e.to_string()))?;

        service
            .waiting()
            .await
            .map_err(|e| TransportError::session(e.to_string()))?;

        info!("STDIO session closed");
        Ok(())
    }
}
