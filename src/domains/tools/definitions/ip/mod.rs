//! IP query toolset.
//!
//! - `my_ip`: public address of this machine
//! - `ip_location`: geolocation of any address (needs `ALIYUN_IP_API_KEY`)

pub mod ip_location;
pub mod my_ip;

use std::sync::Arc;

pub use ip_location::{IpLocation, IpLocationTool};
pub use my_ip::{GetMyIpTool, MyIp};

use crate::core::error::Result;
use crate::domains::tools::{ToolContext, ToolHandler};

pub fn handlers(ctx: &ToolContext) -> Result<Vec<Arc<dyn ToolHandler>>> {
    let config = &ctx.config;
    let app_code = config.credentials.require("ALIYUN_IP_API_KEY")?;
    let handlers: Vec<Arc<dyn ToolHandler>> = vec![
        Arc::new(GetMyIpTool::new(
            ctx.http.clone(),
            config.endpoints.my_ip_url.clone(),
        )),
        Arc::new(IpLocationTool::new(
            ctx.http.clone(),
            config.endpoints.ip_location_url.clone(),
            app_code,
        )),
    ];
    Ok(handlers)
}
