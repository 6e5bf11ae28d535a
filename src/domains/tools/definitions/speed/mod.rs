//! Speed tester toolset.
//!
//! - `network_speed`: latency, download and upload throughput against public servers
//! - `check_url`: single-request reachability check

pub mod check_url;
pub mod network_speed;

use std::sync::Arc;

pub use check_url::{CheckUrlParams, CheckUrlTool};
pub use network_speed::{NetworkSpeedParams, NetworkSpeedTool, SpeedTestServer, default_servers};

use crate::domains::tools::{ToolContext, ToolHandler};

pub fn handlers(ctx: &ToolContext) -> Vec<Arc<dyn ToolHandler>> {
    vec![
        Arc::new(NetworkSpeedTool::new(ctx.http.clone(), default_servers())),
        Arc::new(CheckUrlTool::new(ctx.http.clone())),
    ]
}
