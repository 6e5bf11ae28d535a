//! Core module containing shared infrastructure components.
//!
//! This module provides the foundational building blocks for the tool
//! servers: error handling, configuration, the MCP server handler, the
//! transport layer and the services handlers are built from (HTTP client,
//! command runner, scheduler, poller, signer, token cache).

pub mod config;
pub mod error;
pub mod server;
pub mod services;
pub mod transport;

pub use config::Config;
pub use error::{Error, Result};
pub use server::McpServer;
pub use transport::{TransportConfig, TransportService};
