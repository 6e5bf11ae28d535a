//! Tool-specific error types.
//!
//! Every failure a handler can hit maps onto one [`ToolError`] variant, and
//! every variant maps onto one [`ErrorKind`]. The dispatcher turns errors into
//! error envelopes with [`ToolError::into_result`]; nothing else does.

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Classification carried by every error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The tool name does not match any registered tool.
    MethodNotFound,
    /// Arguments are missing, blank or of the wrong shape.
    InvalidParams,
    /// A referenced entity (task id, cached token, server) does not exist.
    NotFound,
    /// The wrapped provider or OS facility reported a failure.
    UpstreamError,
    /// A bounded wait ran out of attempts.
    Timeout,
    /// Anything the handler did not anticipate.
    InternalError,
}

impl ErrorKind {
    /// Stable machine-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MethodNotFound => "method_not_found",
            Self::InvalidParams => "invalid_params",
            Self::NotFound => "not_found",
            Self::UpstreamError => "upstream_error",
            Self::Timeout => "timeout",
            Self::InternalError => "internal_error",
        }
    }

    /// JSON-RPC style numeric code.
    pub fn code(&self) -> i32 {
        match self {
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::NotFound => -32002,
            Self::UpstreamError => -32003,
            Self::Timeout => -32004,
        }
    }
}

/// Errors that can occur during tool operations.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool was not found.
    #[error("Tool not found: {0}")]
    UnknownTool(String),

    /// Invalid arguments were provided to the tool.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// A referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The external service or command failed.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A bounded wait gave up.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Create a new "unknown tool" error.
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool(name.into())
    }

    /// Create a new "invalid arguments" error.
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create a new "not found" error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new "upstream" error.
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// Create a new "timeout" error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a new "internal" error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The envelope classification for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTool(_) => ErrorKind::MethodNotFound,
            Self::InvalidArguments(_) => ErrorKind::InvalidParams,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Upstream(_) => ErrorKind::UpstreamError,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Convert into an error envelope.
    ///
    /// The text content carries the human-readable message; the structured
    /// content carries `{"error": {"kind", "code", "message"}}` so callers can
    /// branch on the classification without parsing text.
    pub fn into_result(self) -> CallToolResult {
        let kind = self.kind();
        let message = self.to_string();
        warn!(kind = kind.as_str(), "{}", message);

        CallToolResult {
            content: vec![Content::text(message.clone())],
            structured_content: Some(serde_json::json!({
                "error": {
                    "kind": kind.as_str(),
                    "code": kind.code(),
                    "message": message,
                }
            })),
            is_error: Some(true),
            meta: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(ToolError::unknown_tool("x").kind(), ErrorKind::MethodNotFound);
        assert_eq!(ToolError::invalid_arguments("x").kind(), ErrorKind::InvalidParams);
        assert_eq!(ToolError::not_found("x").kind(), ErrorKind::NotFound);
        assert_eq!(ToolError::upstream("x").kind(), ErrorKind::UpstreamError);
        assert_eq!(ToolError::timeout("x").kind(), ErrorKind::Timeout);
        assert_eq!(ToolError::internal("x").kind(), ErrorKind::InternalError);
    }

    #[test]
    fn test_into_result_is_error_envelope() {
        let result = ToolError::upstream("HTTP 502 from provider").into_result();
        assert_eq!(result.is_error, Some(true));

        let structured = result.structured_content.expect("classification present");
        assert_eq!(structured["error"]["kind"], "upstream_error");
        assert_eq!(structured["error"]["code"], -32003);
        assert!(
            structured["error"]["message"]
                .as_str()
                .unwrap()
                .contains("502")
        );

        let text = match &result.content[0].raw {
            rmcp::model::RawContent::Text(t) => &t.text,
            _ => panic!("Expected text content"),
        };
        assert!(text.contains("HTTP 502"));
    }

    #[test]
    fn test_codes_follow_jsonrpc() {
        assert_eq!(ErrorKind::MethodNotFound.code(), -32601);
        assert_eq!(ErrorKind::InvalidParams.code(), -32602);
        assert_eq!(ErrorKind::InternalError.code(), -32603);
    }
}
