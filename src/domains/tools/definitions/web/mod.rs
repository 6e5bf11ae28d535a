//! Web toolset: open pages and search results in the default browser.

pub mod open_web;
pub mod web_search;

use std::sync::Arc;

pub use open_web::{OpenWebTool, normalize_url};
pub use web_search::{SearchEngine, WebSearchTool};

use crate::domains::tools::{ToolContext, ToolHandler};

pub fn handlers(ctx: &ToolContext) -> Vec<Arc<dyn ToolHandler>> {
    vec![
        Arc::new(OpenWebTool::new(ctx.runner.clone())),
        Arc::new(WebSearchTool::new(ctx.runner.clone())),
    ]
}
