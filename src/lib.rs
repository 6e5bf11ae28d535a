//! Single-purpose MCP tool servers.
//!
//! Each process serves one toolset (network speed, location, IP lookup,
//! translation, web, notifications, power, Bilibili) selected with
//! `MCP_TOOLSET`, behind a shared registry, dispatcher and error envelope.
//!
//! # Architecture
//!
//! - **core**: configuration, errors, the MCP server handler, transports and
//!   the services handlers are built from (HTTP client, command runner,
//!   scheduler, poller, request signer, token cache)
//! - **domains::tools**: the handler trait, registry, dispatcher and the
//!   toolset definitions
//!
//! # Example
//!
//! ```rust,no_run
//! use mcp_tool_servers::core::{Config, McpServer, TransportService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let server = McpServer::new(config.clone())?;
//!     TransportService::new(config.transport).run(server).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
pub use domains::tools::{Dispatcher, ToolError, ToolRegistry, Toolset};
