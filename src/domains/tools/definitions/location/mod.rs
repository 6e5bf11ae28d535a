//! Location toolset.

pub mod get_location;

use std::sync::Arc;

pub use get_location::{Coordinates, GetLocationTool, LocationEndpoints};

use crate::domains::tools::{ToolContext, ToolHandler};

pub fn handlers(ctx: &ToolContext) -> Vec<Arc<dyn ToolHandler>> {
    let endpoints = &ctx.config.endpoints;
    vec![Arc::new(GetLocationTool::new(
        ctx.http.clone(),
        ctx.runner.clone(),
        LocationEndpoints {
            page_url: endpoints.location_page_url.clone(),
            api_url: endpoints.location_api_url.clone(),
        },
        ctx.config.runtime.poll_policy(),
    ))]
}
