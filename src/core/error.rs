//! Process-level error type.
//!
//! These errors only surface at startup (configuration, registry
//! construction) or from the transport. Tool failures never become an
//! [`Error`]; they are [`ToolError`](crate::domains::tools::ToolError)s
//! turned into error envelopes by the dispatcher.

use thiserror::Error;

/// A specialized Result type for MCP server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the tool servers.
#[derive(Debug, Error)]
pub enum Error {
    /// Error originating from the tools domain.
    #[error("Tool error: {0}")]
    Tool(#[from] crate::domains::tools::ToolError),

    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failures (bind, protocol, service).
    #[error("Transport error: {0}")]
    Transport(#[from] super::transport::TransportError),

    /// I/O errors from file operations or network communication.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors that should not occur under normal operation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::ToolError;

    #[test]
    fn test_tool_error_converts() {
        let err: Error = ToolError::internal("client build failed").into();
        assert!(matches!(err, Error::Tool(_)));
        assert!(err.to_string().contains("client build failed"));
    }

    #[test]
    fn test_config_error_message() {
        let err = Error::config("MCP_TOOLSET is not set");
        assert_eq!(err.to_string(), "Configuration error: MCP_TOOLSET is not set");
    }
}
