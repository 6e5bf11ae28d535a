//! Bilibili open-platform toolset.
//!
//! - `client`: credentials, request signing, OAuth grants, token cache
//! - `token`: local token check
//! - `oauth`: web authorization, code polling, refresh
//! - `open_api`: signed user and video queries

pub mod client;
pub mod oauth;
pub mod open_api;
pub mod token;

use std::sync::Arc;

pub use client::{BilibiliClient, BilibiliEndpoints};
pub use oauth::{PollAndTokenTool, RefreshTokenTool, WebAuthorizeLinkTool};
pub use open_api::{OpenApi, OpenApiTool};
pub use token::CheckLocalTokenTool;

use crate::core::error::Result;
use crate::core::services::TokenCache;
use crate::domains::tools::{ToolContext, ToolHandler};

pub fn handlers(ctx: &ToolContext) -> Result<Vec<Arc<dyn ToolHandler>>> {
    let config = &ctx.config;
    let endpoints = &config.endpoints;
    let cache = TokenCache::new(config.storage.bilibili_token_path.clone());
    let client = BilibiliClient::new(
        ctx.http.clone(),
        config.credentials.require("BILIBILI_CLIENT_ID")?,
        config.credentials.require("BILIBILI_CLIENT_SECRET")?,
        BilibiliEndpoints {
            authorize_url: endpoints.bilibili_authorize_url.clone(),
            relay_url: endpoints.bilibili_relay_url.clone(),
            token_url: endpoints.bilibili_token_url.clone(),
            refresh_url: endpoints.bilibili_refresh_url.clone(),
            api_base: endpoints.bilibili_api_base.clone(),
        },
        cache.clone(),
    );

    let mut handlers: Vec<Arc<dyn ToolHandler>> = vec![
        Arc::new(CheckLocalTokenTool::new(cache)),
        Arc::new(WebAuthorizeLinkTool::new(client.clone(), ctx.runner.clone())),
        Arc::new(PollAndTokenTool::new(
            client.clone(),
            config.runtime.poll_policy(),
        )),
        Arc::new(RefreshTokenTool::new(client.clone())),
    ];
    handlers.extend(
        OpenApi::ALL
            .into_iter()
            .map(|api| Arc::new(OpenApiTool::new(api, client.clone())) as Arc<dyn ToolHandler>),
    );
    Ok(handlers)
}
