//! Errors raised while bringing a transport up or serving on it.

use thiserror::Error;

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The listener could not bind its address.
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The MCP session could not be initialized.
    #[error("Session initialization failed: {0}")]
    Init(String),

    /// An initialized rmcp session ended with an error.
    #[error("Session error: {0}")]
    Session(String),

    #[error("HTTP server error: {0}")]
    Http(String),
}

impl TransportError {
    pub fn bind(address: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            address: address.into(),
            source,
        }
    }

    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_bind_error_names_address() {
        let err = TransportError::bind(
            "127.0.0.1:3000",
            io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        );
        let text = err.to_string();
        assert!(text.contains("127.0.0.1:3000"));
        assert!(text.contains("address in use"));
    }

    #[test]
    fn test_converts_into_process_error() {
        let err: crate::core::Error = TransportError::session("connection reset").into();
        assert!(err.to_string().contains("connection reset"));
    }
}
