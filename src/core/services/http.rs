//! Outbound HTTP client shared by every tool.
//!
//! Wraps `reqwest::Client` so that every upstream failure mode (transport
//! error, non-2xx status, HTML error page, non-JSON body) maps onto a
//! [`ToolError`] with a short excerpt of what the provider actually sent.

use std::time::{Duration, Instant};

use reqwest::{RequestBuilder, StatusCode, header::CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domains::tools::ToolError;

/// Number of body characters quoted in upstream error messages.
const ERROR_EXCERPT_CHARS: usize = 200;

/// A fully-read upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: String,
    pub elapsed: Duration,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// First `max_chars` characters of the body.
    pub fn excerpt(&self, max_chars: usize) -> String {
        let excerpt: String = self.body.chars().take(max_chars).collect();
        if self.body.chars().count() > max_chars {
            format!("{}...", excerpt)
        } else {
            excerpt
        }
    }

    /// Fail with the status code and a body excerpt unless the status is 2xx.
    pub fn ensure_success(self) -> Result<Self, ToolError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(ToolError::upstream(format!(
            "HTTP {}: {}",
            self.status.as_u16(),
            self.excerpt(ERROR_EXCERPT_CHARS)
        )))
    }

    /// Heuristic for providers that answer errors with an HTML page and a 200.
    pub fn looks_like_html(&self) -> bool {
        if self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("text/html"))
        {
            return true;
        }
        let head: String = self.body.trim_start().chars().take(15).collect();
        let head = head.to_ascii_lowercase();
        head.starts_with("<!doctype") || head.starts_with("<html")
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ToolError> {
        if self.looks_like_html() {
            return Err(ToolError::upstream(format!(
                "expected JSON but received an HTML page (HTTP {}): {}",
                self.status.as_u16(),
                self.excerpt(100)
            )));
        }
        serde_json::from_str(&self.body).map_err(|e| {
            ToolError::upstream(format!(
                "invalid JSON response ({}): {}",
                e,
                self.excerpt(100)
            ))
        })
    }
}

/// Thin wrapper over `reqwest::Client` with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Build a client whose requests fail after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mcp-tool-servers/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ToolError::internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Access the underlying client to build requests.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Send a request and read the whole body.
    pub async fn send(&self, request: RequestBuilder) -> Result<UpstreamResponse, ToolError> {
        let started = Instant::now();
        let response = request.send().await.map_err(transport_error)?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(transport_error)?;
        let elapsed = started.elapsed();

        debug!(status = status.as_u16(), elapsed_ms = elapsed.as_millis() as u64, "Upstream responded");

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
            elapsed,
        })
    }

    /// Send, require a 2xx status and decode JSON.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ToolError> {
        self.send(request).await?.ensure_success()?.json()
    }
}

/// Map a reqwest failure onto the envelope taxonomy.
pub fn transport_error(e: reqwest::Error) -> ToolError {
    if e.is_timeout() {
        ToolError::timeout(format!("request timed out: {}", e))
    } else {
        ToolError::upstream(format!("request failed: {}", e))
    }
}
