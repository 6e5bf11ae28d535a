//! Transport configuration types.

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
#[cfg(any(feature = "tcp", feature = "http"))]
use crate::core::error::Error;

/// Transport configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    /// Standard input/output transport (default for MCP).
    #[cfg(feature = "stdio")]
    Stdio,

    /// TCP socket transport; each connection is an MCP session.
    #[cfg(feature = "tcp")]
    Tcp(TcpConfig),

    /// HTTP transport with JSON-RPC over POST.
    #[cfg(feature = "http")]
    Http(HttpConfig),
}

/// TCP transport configuration.
#[cfg(feature = "tcp")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpConfig {
    pub port: u16,
    pub host: String,
}

/// HTTP transport configuration.
#[cfg(feature = "http")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,

    /// Path for the JSON-RPC endpoint.
    pub rpc_path: String,

    /// Enable CORS for browser clients.
    pub enable_cors: bool,
}

#[cfg(any(feature = "tcp", feature = "http"))]
const DEFAULT_HOST: &str = "127.0.0.1";

#[cfg(feature = "tcp")]
impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: DEFAULT_HOST.to_string(),
        }
    }
}

#[cfg(feature = "http")]
impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: DEFAULT_HOST.to_string(),
            rpc_path: "/mcp".to_string(),
            enable_cors: true,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        #[cfg(feature = "stdio")]
        {
            return Self::Stdio;
        }

        #[cfg(all(not(feature = "stdio"), feature = "tcp"))]
        {
            return Self::Tcp(TcpConfig::default());
        }

        #[cfg(all(not(feature = "stdio"), not(feature = "tcp"), feature = "http"))]
        {
            return Self::Http(HttpConfig::default());
        }

        #[cfg(not(any(feature = "stdio", feature = "tcp", feature = "http")))]
        {
            compile_error!("At least one transport feature must be enabled: stdio, tcp, or http");
        }
    }
}

impl TransportConfig {
    /// Select a transport from `MCP_TRANSPORT` and its `MCP_TCP_*` /
    /// `MCP_HTTP_*` settings. Unset or unknown values select the default.
    pub fn from_lookup<G>(get: &G) -> Result<Self>
    where
        G: Fn(&str) -> Option<String>,
    {
        let transport = get("MCP_TRANSPORT").unwrap_or_default().to_lowercase();

        match transport.as_str() {
            #[cfg(feature = "tcp")]
            "tcp" => {
                let defaults = TcpConfig::default();
                Ok(Self::Tcp(TcpConfig {
                    port: parse_port(get, "MCP_TCP_PORT", defaults.port)?,
                    host: get("MCP_TCP_HOST").unwrap_or(defaults.host),
                }))
            }
            #[cfg(feature = "http")]
            "http" => {
                let defaults = HttpConfig::default();
                Ok(Self::Http(HttpConfig {
                    port: parse_port(get, "MCP_HTTP_PORT", defaults.port)?,
                    host: get("MCP_HTTP_HOST").unwrap_or(defaults.host),
                    rpc_path: get("MCP_HTTP_PATH").unwrap_or(defaults.rpc_path),
                    enable_cors: get("MCP_HTTP_CORS")
                        .map(|v| v.to_lowercase() != "false" && v != "0")
                        .unwrap_or(defaults.enable_cors),
                }))
            }
            _ => Ok(Self::default()),
        }
    }

    /// Get a description of this transport for logging.
    pub fn description(&self) -> String {
        match self {
            #[cfg(feature = "stdio")]
            Self::Stdio => "STDIO (standard MCP mode)".to_string(),
            #[cfg(feature = "tcp")]
            Self::Tcp(cfg) => format!("TCP on {}:{}", cfg.host, cfg.port),
            #[cfg(feature = "http")]
            Self::Http(cfg) => format!("HTTP on {}:{}{}", cfg.host, cfg.port, cfg.rpc_path),
        }
    }
}

#[cfg(any(feature = "tcp", feature = "http"))]
fn parse_port<G>(get: &G, key: &str, default: u16) -> Result<u16>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(v) => v
            .parse()
            .map_err(|_| Error::config(format!("{}: '{}' is not a valid port", key, v))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none(_: &str) -> Option<String> {
        None
    }

    #[cfg(feature = "stdio")]
    #[test]
    fn test_default_is_stdio() {
        let config = TransportConfig::from_lookup(&none).unwrap();
        assert!(matches!(config, TransportConfig::Stdio));
        assert!(config.description().contains("STDIO"));
    }

    #[cfg(feature = "tcp")]
    #[test]
    fn test_tcp_from_lookup() {
        let get = |key: &str| match key {
            "MCP_TRANSPORT" => Some("TCP".to_string()),
            "MCP_TCP_PORT" => Some("4000".to_string()),
            _ => None,
        };
        match TransportConfig::from_lookup(&get).unwrap() {
            TransportConfig::Tcp(cfg) => {
                assert_eq!(cfg.port, 4000);
                assert_eq!(cfg.host, "127.0.0.1");
            }
            other => panic!("unexpected transport: {:?}", other),
        }
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_http_bad_port() {
        let get = |key: &str| match key {
            "MCP_TRANSPORT" => Some("http".to_string()),
            "MCP_HTTP_PORT" => Some("eighty".to_string()),
            _ => None,
        };
        assert!(TransportConfig::from_lookup(&get).is_err());
    }
}
