//! Network speed test tool.
//!
//! Measures latency (time to a complete GET of each server's ping URL),
//! download throughput (bytes streamed from the download URL during a fixed
//! window) and upload throughput (fixed-size POSTs repeated for the same
//! window) against a built-in list of public servers.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::core::services::HttpClient;
use crate::domains::tools::{ToolError, ToolHandler, describe, parse_params, structured_result};

const DEFAULT_DURATION_MS: u64 = 3_000;
const MIN_DURATION_MS: u64 = 500;
const MAX_DURATION_MS: u64 = 30_000;
const PING_TIMEOUT: Duration = Duration::from_secs(5);
/// Extra time granted to the download request beyond the measuring window.
const DOWNLOAD_GRACE: Duration = Duration::from_secs(5);
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Servers
// ============================================================================

/// A public endpoint used for measurements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedTestServer {
    pub name: String,
    pub ping_url: String,
    pub download_url: String,
    /// POST target for upload tests; servers without one skip upload.
    pub upload_url: Option<String>,
}

impl SpeedTestServer {
    pub fn new(
        name: impl Into<String>,
        ping_url: impl Into<String>,
        download_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ping_url: ping_url.into(),
            download_url: download_url.into(),
            upload_url: None,
        }
    }

    pub fn with_upload(mut self, upload_url: impl Into<String>) -> Self {
        self.upload_url = Some(upload_url.into());
        self
    }
}

/// The built-in server list.
pub fn default_servers() -> Vec<SpeedTestServer> {
    vec![
        SpeedTestServer::new(
            "Cloudflare",
            "https://speed.cloudflare.com",
            // 50 MiB, more than any window can consume.
            "https://speed.cloudflare.com/__down?bytes=52428800",
        )
        .with_upload("https://speed.cloudflare.com/__up"),
        SpeedTestServer::new("Fast.com (Netflix)", "https://fast.com", "https://fast.com"),
        SpeedTestServer::new(
            "GitHub CDN",
            "https://github.com",
            "https://github.com/git-for-windows/git/releases/download/v2.40.0.windows.1/Git-2.40.0-64-bit.exe",
        ),
    ]
}

// ============================================================================
// Tool Parameters
// ============================================================================

/// What to measure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    /// Latency only.
    Ping,
    /// Download throughput only.
    Download,
    /// Upload throughput only.
    Upload,
    /// Latency, download and upload throughput.
    #[default]
    Full,
}

impl TestType {
    fn includes_ping(self) -> bool {
        matches!(self, TestType::Ping | TestType::Full)
    }

    fn includes_download(self) -> bool {
        matches!(self, TestType::Download | TestType::Full)
    }

    fn includes_upload(self) -> bool {
        matches!(self, TestType::Upload | TestType::Full)
    }
}

/// Parameters for the network speed test.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct NetworkSpeedParams {
    /// Test type: ping, download, upload or full (default: full).
    #[serde(default, alias = "testType")]
    pub test_type: TestType,

    /// Download and upload measuring window in milliseconds (default: 3000, range 500-30000).
    #[serde(default, alias = "durationMs")]
    pub duration_ms: Option<u64>,

    /// Only test servers whose name contains this text, e.g. "Cloudflare".
    #[serde(default, alias = "serverName")]
    pub server_name: Option<String>,
}

// ============================================================================
// Tool Output
// ============================================================================

/// Measurements for one server.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ServerMeasurement {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_mbps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_mbps: Option<f64>,
    /// Failed measurements, one message each.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Structured output of a speed test.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SpeedTestReport {
    pub test_type: TestType,
    pub duration_ms: u64,
    pub timestamp: String,
    pub servers: Vec<ServerMeasurement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_ping_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_download_mbps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_upload_mbps: Option<f64>,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Latency, download and upload speed test.
pub struct NetworkSpeedTool {
    http: HttpClient,
    servers: Vec<SpeedTestServer>,
}

impl NetworkSpeedTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "test_network_speed";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Test network speed (latency, download and upload throughput) against public servers such as Cloudflare, Fast.com and GitHub CDN. Each throughput window defaults to 3 seconds; only Cloudflare accepts uploads.";

    pub fn new(http: HttpClient, servers: Vec<SpeedTestServer>) -> Self {
        Self { http, servers }
    }

    /// Run the measurements for validated parameters.
    #[instrument(skip_all, fields(test_type = ?params.test_type))]
    pub async fn execute(&self, params: NetworkSpeedParams) -> Result<SpeedTestReport, ToolError> {
        let duration_ms = params
            .duration_ms
            .unwrap_or(DEFAULT_DURATION_MS)
            .clamp(MIN_DURATION_MS, MAX_DURATION_MS);
        let window = Duration::from_millis(duration_ms);

        let filter = params
            .server_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let servers: Vec<&SpeedTestServer> = self
            .servers
            .iter()
            .filter(|s| {
                filter
                    .as_deref()
                    .is_none_or(|f| s.name.to_lowercase().contains(f))
            })
            .collect();

        if servers.is_empty() {
            return Err(ToolError::not_found(format!(
                "no test server matches '{}'",
                params.server_name.unwrap_or_default()
            )));
        }

        info!(
            servers = servers.len(),
            duration_ms, "Running network speed test"
        );

        let mut measurements = Vec::with_capacity(servers.len());
        for server in servers {
            let mut measurement = ServerMeasurement {
                name: server.name.clone(),
                ping_ms: None,
                download_mbps: None,
                upload_mbps: None,
                errors: Vec::new(),
            };

            if params.test_type.includes_ping() {
                match self.ping(&server.ping_url).await {
                    Ok(ms) => measurement.ping_ms = Some(ms),
                    Err(e) => {
                        warn!(server = %server.name, "Ping failed: {}", e);
                        measurement.errors.push(format!("ping: {}", e));
                    }
                }
            }

            if params.test_type.includes_download() {
                match self.download(&server.download_url, window).await {
                    Ok(mbps) => measurement.download_mbps = Some(mbps),
                    Err(e) => {
                        warn!(server = %server.name, "Download test failed: {}", e);
                        measurement.errors.push(format!("download: {}", e));
                    }
                }
            }

            if params.test_type.includes_upload() {
                let result = match server.upload_url.as_deref() {
                    Some(url) => self.upload(url, window).await,
                    None => Err(ToolError::upstream("not supported by this server")),
                };
                match result {
                    Ok(mbps) => measurement.upload_mbps = Some(mbps),
                    Err(e) => {
                        warn!(server = %server.name, "Upload test failed: {}", e);
                        measurement.errors.push(format!("upload: {}", e));
                    }
                }
            }

            measurements.push(measurement);
        }

        let best_ping_ms = measurements.iter().filter_map(|m| m.ping_ms).min();
        let best_download_mbps = measurements
            .iter()
            .filter_map(|m| m.download_mbps)
            .max_by(|a, b| a.total_cmp(b));
        let best_upload_mbps = measurements
            .iter()
            .filter_map(|m| m.upload_mbps)
            .max_by(|a, b| a.total_cmp(b));

        Ok(SpeedTestReport {
            test_type: params.test_type,
            duration_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
            servers: measurements,
            best_ping_ms,
            best_download_mbps,
            best_upload_mbps,
        })
    }

    async fn ping(&self, url: &str) -> Result<u64, ToolError> {
        let request = self.http.client().get(url).timeout(PING_TIMEOUT);
        let response = self.http.send(request).await?.ensure_success()?;
        Ok(response.elapsed.as_millis() as u64)
    }

    /// Stream the download URL for `window` and return megabits per second.
    async fn download(&self, url: &str, window: Duration) -> Result<f64, ToolError> {
        use crate::core::services::http::transport_error;

        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + window;

        let mut response = self
            .http
            .client()
            .get(url)
            .timeout(window + DOWNLOAD_GRACE)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(ToolError::upstream(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }

        let mut total_bytes: u64 = 0;
        loop {
            match tokio::time::timeout_at(deadline, response.chunk()).await {
                Ok(Ok(Some(chunk))) => total_bytes += chunk.len() as u64,
                Ok(Ok(None)) => break,
                Ok(Err(e)) => return Err(transport_error(e)),
                // Window elapsed.
                Err(_) => break,
            }
        }

        Ok(mbps(total_bytes, started.elapsed()))
    }

    /// POST fixed-size chunks until `window` elapses and return megabits per second.
    async fn upload(&self, url: &str, window: Duration) -> Result<f64, ToolError> {
        use crate::core::services::http::transport_error;

        let payload = vec![0u8; UPLOAD_CHUNK_BYTES];
        let started = Instant::now();
        let mut total_bytes: u64 = 0;

        while started.elapsed() < window {
            let response = self
                .http
                .client()
                .post(url)
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .timeout(UPLOAD_TIMEOUT)
                .body(payload.clone())
                .send()
                .await
                .map_err(transport_error)?;

            if !response.status().is_success() {
                return Err(ToolError::upstream(format!(
                    "HTTP {}",
                    response.status().as_u16()
                )));
            }
            total_bytes += payload.len() as u64;
        }

        Ok(mbps(total_bytes, started.elapsed()))
    }
}

fn mbps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64().max(0.001);
    round2((bytes as f64 * 8.0) / (1_000_000.0 * secs))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn summarize(report: &SpeedTestReport) -> String {
    let mut lines = vec![format!(
        "Network speed test ({:?}, {} ms window)",
        report.test_type, report.duration_ms
    )];
    for server in &report.servers {
        let mut parts = Vec::new();
        if let Some(ms) = server.ping_ms {
            parts.push(format!("ping {} ms", ms));
        }
        if let Some(mbps) = server.download_mbps {
            parts.push(format!("download {:.2} Mbps", mbps));
        }
        if let Some(mbps) = server.upload_mbps {
            parts.push(format!("upload {:.2} Mbps", mbps));
        }
        for error in &server.errors {
            parts.push(format!("failed {}", error));
        }
        lines.push(format!("- {}: {}", server.name, parts.join(", ")));
    }
    lines.join("\n")
}

#[async_trait]
impl ToolHandler for NetworkSpeedTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<NetworkSpeedParams, SpeedTestReport>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let params: NetworkSpeedParams = parse_params(arguments)?;
        let report = self.execute(params).await?;
        structured_result(summarize(&report), &report)
    }
}
