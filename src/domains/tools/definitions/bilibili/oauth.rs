//! Web OAuth flow: authorize link, code polling and token refresh.

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::client::{BilibiliClient, RelayStatus};
use crate::core::services::{CommandRunner, PollPolicy, PollStatus, StoredToken, poll_until};
use crate::domains::tools::{
    ToolError, ToolHandler, describe, parse_params, require_non_empty, structured_result,
};

/// Tokens handed back to the caller after a grant.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds after which the access token expires.
    pub expires_in: i64,
}

impl From<StoredToken> for TokenGrant {
    fn from(token: StoredToken) -> Self {
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_at,
        }
    }
}

// ============================================================================
// bilibili_web_authorize_link
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct AuthorizeLinkParams {}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AuthorizeLink {
    /// Identifies this authorization; pass it to bilibili_web_poll_and_token.
    pub state: String,
    pub authorize_url: String,
    pub tips: String,
}

pub struct WebAuthorizeLinkTool {
    client: BilibiliClient,
    runner: Arc<dyn CommandRunner>,
}

impl WebAuthorizeLinkTool {
    pub const NAME: &'static str = "bilibili_web_authorize_link";

    pub const DESCRIPTION: &'static str = "Generate a Bilibili web authorization link and open it in the browser. After the user authorizes, call bilibili_web_poll_and_token with the returned state.";

    pub fn new(client: BilibiliClient, runner: Arc<dyn CommandRunner>) -> Self {
        Self { client, runner }
    }

    #[instrument(skip_all)]
    pub async fn execute(&self) -> Result<AuthorizeLink, ToolError> {
        let state = Uuid::new_v4().simple().to_string();
        let url = self.client.authorize_url(&state)?;

        let tips = match self.runner.open_url(url.as_str()).await {
            Ok(()) => {
                info!(state = %state, "Authorization page opened");
                "The authorization page was opened in your browser. Approve access, then call bilibili_web_poll_and_token with this state.".to_string()
            }
            Err(e) => {
                warn!("Failed to open the browser: {}", e);
                "Open authorize_url in a browser and approve access, then call bilibili_web_poll_and_token with this state.".to_string()
            }
        };

        Ok(AuthorizeLink {
            state,
            authorize_url: url.to_string(),
            tips,
        })
    }
}

#[async_trait]
impl ToolHandler for WebAuthorizeLinkTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<AuthorizeLinkParams, AuthorizeLink>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let _: AuthorizeLinkParams = parse_params(arguments)?;
        let link = self.execute().await?;
        structured_result(
            format!("{}\n{}", link.tips, link.authorize_url),
            &link,
        )
    }
}

// ============================================================================
// bilibili_web_poll_and_token
// ============================================================================

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PollAndTokenParams {
    /// State returned by bilibili_web_authorize_link.
    pub state: String,
}

pub struct PollAndTokenTool {
    client: BilibiliClient,
    poll: PollPolicy,
}

impl PollAndTokenTool {
    pub const NAME: &'static str = "bilibili_web_poll_and_token";

    pub const DESCRIPTION: &'static str = "Wait for the authorization code of a pending web authorization (by state), exchange it for an access token and cache the token locally.";

    pub fn new(client: BilibiliClient, poll: PollPolicy) -> Self {
        Self { client, poll }
    }

    #[instrument(skip_all, fields(state = %state))]
    pub async fn execute(&self, state: &str) -> Result<TokenGrant, ToolError> {
        let code = poll_until(self.poll, "authorization code", |attempt| async move {
            match self.client.lookup_code(state).await {
                Ok(RelayStatus::Code(code)) => PollStatus::Ready(code),
                Ok(RelayStatus::Expired) => {
                    PollStatus::Abort("authorization expired, start again".to_string())
                }
                Ok(RelayStatus::Pending) => PollStatus::Pending,
                Err(e) => {
                    warn!(attempt, "Relay lookup failed: {}", e);
                    PollStatus::Pending
                }
            }
        })
        .await?;

        let token = self.client.exchange_code(&code).await?;
        Ok(token.into())
    }
}

#[async_trait]
impl ToolHandler for PollAndTokenTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<PollAndTokenParams, TokenGrant>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let params: PollAndTokenParams = parse_params(arguments)?;
        let state = require_non_empty("state", &params.state)?;
        let grant = self.execute(state).await?;
        structured_result("Authorization complete, token cached", &grant)
    }
}

// ============================================================================
// bilibili_refresh_token
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct RefreshTokenParams {
    /// Refresh token to use; the cached one when omitted.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

pub struct RefreshTokenTool {
    client: BilibiliClient,
}

impl RefreshTokenTool {
    pub const NAME: &'static str = "bilibili_refresh_token";

    pub const DESCRIPTION: &'static str =
        "Refresh the Bilibili access token and overwrite the local token cache.";

    pub fn new(client: BilibiliClient) -> Self {
        Self { client }
    }

    pub async fn execute(&self, params: RefreshTokenParams) -> Result<TokenGrant, ToolError> {
        let explicit = params
            .refresh_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        // An expired cache entry still carries a usable refresh token.
        let refresh_token = explicit
            .or_else(|| {
                self.client
                    .cache()
                    .load()
                    .map(|t| t.refresh_token)
                    .filter(|t| !t.is_empty())
            })
            .ok_or_else(|| {
                ToolError::invalid_arguments(
                    "no refresh_token given and none cached; authorize first",
                )
            })?;

        let token = self.client.refresh(&refresh_token).await?;
        Ok(token.into())
    }
}

#[async_trait]
impl ToolHandler for RefreshTokenTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<RefreshTokenParams, TokenGrant>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let params: RefreshTokenParams = parse_params(arguments)?;
        let grant = self.execute(params).await?;
        structured_result("Token refreshed and cached", &grant)
    }
}
