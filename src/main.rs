//! Tool server entry point.
//!
//! Loads configuration, initializes logging on stderr, builds the server
//! for the configured toolset and runs the configured transport. Missing
//! configuration or credentials abort startup with a diagnostic.

use anyhow::{Context, Result};
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use mcp_tool_servers::core::{Config, McpServer, TransportService};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;

    init_logging(&config.logging.level);

    info!(
        toolset = %config.toolset,
        "Starting {} v{}",
        config.server.name,
        config.server.version
    );

    let server = McpServer::new(config.clone())
        .with_context(|| format!("failed to initialize the {} toolset", config.toolset))?;

    info!("Server initialized");

    TransportService::new(config.transport)
        .run(server)
        .await
        .context("transport failed")?;

    info!("Server shutting down");

    Ok(())
}

/// Initialize the logging subsystem.
///
/// Output goes to stderr; stdout belongs to the STDIO transport.
fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
