//! Transports that carry MCP traffic to a [`McpServer`](crate::core::McpServer).
//!
//! | Transport | Feature | Sessions |
//! |---|---|---|
//! | stdio | `stdio` (default) | one, over stdin/stdout |
//! | tcp | `tcp` | one rmcp session per accepted connection |
//! | http | `http` | stateless JSON-RPC over POST |
//!
//! All three end in the same dispatcher, so a toolset behaves identically
//! whichever transport is selected with `MCP_TRANSPORT`.

mod config;
mod error;
mod service;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "tcp")]
pub mod tcp;

#[cfg(feature = "stdio")]
pub mod stdio;

pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use service::TransportService;

#[cfg(feature = "tcp")]
pub use config::TcpConfig;

#[cfg(feature = "http")]
pub use config::HttpConfig;
