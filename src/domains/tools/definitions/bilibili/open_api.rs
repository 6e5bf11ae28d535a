//! Signed read-only calls against the Bilibili open platform.

use async_trait::async_trait;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use super::client::BilibiliClient;
use crate::domains::tools::{ToolError, ToolHandler, describe, parse_params, structured_result};

/// Open-platform endpoints exposed as tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenApi {
    UserInfo,
    UserStat,
    VideoList,
    VideoCategories,
}

impl OpenApi {
    pub const ALL: [OpenApi; 4] = [
        OpenApi::UserInfo,
        OpenApi::UserStat,
        OpenApi::VideoList,
        OpenApi::VideoCategories,
    ];

    pub fn tool_name(&self) -> &'static str {
        match self {
            OpenApi::UserInfo => "bilibili_get_user_info",
            OpenApi::UserStat => "bilibili_get_user_stat",
            OpenApi::VideoList => "bilibili_get_video_list",
            OpenApi::VideoCategories => "bilibili_get_video_categories",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            OpenApi::UserInfo => "/arcopen/fn/user/account/info",
            OpenApi::UserStat => "/arcopen/fn/data/user/stat",
            OpenApi::VideoList => "/arcopen/fn/archive/viewlist?ps=20&pn=1&status=all",
            OpenApi::VideoCategories => "/arcopen/fn/archive/type/list",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            OpenApi::UserInfo => "Get the authorized Bilibili user's name, avatar and openid.",
            OpenApi::UserStat => {
                "Get the authorized Bilibili user's following, follower and published video counts."
            }
            OpenApi::VideoList => "List the authorized user's uploaded videos (first 20).",
            OpenApi::VideoCategories => "List the video categories available for uploads.",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct AccessTokenParams {
    /// Access token; the cached one when omitted.
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UserInfo {
    pub name: String,
    /// Avatar URL.
    pub face: String,
    pub openid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UserStat {
    #[serde(default)]
    pub following: u64,
    #[serde(default)]
    pub follower: u64,
    #[serde(default)]
    pub arc_passed_total: u64,
}

pub struct OpenApiTool {
    api: OpenApi,
    client: BilibiliClient,
}

impl OpenApiTool {
    pub fn new(api: OpenApi, client: BilibiliClient) -> Self {
        Self { api, client }
    }

    async fn fetch(&self, access_token: &str) -> Result<(String, Value), ToolError> {
        let path = self.api.path();
        let (summary, value) = match self.api {
            OpenApi::UserInfo => {
                let info: UserInfo = self.client.signed_get(path, access_token).await?;
                (format!("{} (openid {})", info.name, info.openid), to_value(&info)?)
            }
            OpenApi::UserStat => {
                let stat: UserStat = self.client.signed_get(path, access_token).await?;
                (
                    format!(
                        "following {}, followers {}, published videos {}",
                        stat.following, stat.follower, stat.arc_passed_total
                    ),
                    to_value(&stat)?,
                )
            }
            OpenApi::VideoList | OpenApi::VideoCategories => {
                let data: Value = self.client.signed_get(path, access_token).await?;
                (data.to_string(), data)
            }
        };
        Ok((summary, value))
    }

    #[instrument(skip_all, fields(tool = self.api.tool_name()))]
    pub async fn execute(&self, params: AccessTokenParams) -> Result<(String, Value), ToolError> {
        let access_token = self.client.resolve_token(params.access_token.as_deref())?;
        info!("Calling open platform");
        self.fetch(&access_token).await
    }
}

fn to_value<T: Serialize>(data: &T) -> Result<Value, ToolError> {
    serde_json::to_value(data)
        .map_err(|e| ToolError::internal(format!("failed to serialize result: {}", e)))
}

#[async_trait]
impl ToolHandler for OpenApiTool {
    fn name(&self) -> &'static str {
        self.api.tool_name()
    }

    fn tool(&self) -> Tool {
        let name = self.api.tool_name();
        let description = self.api.description();
        match self.api {
            OpenApi::UserInfo => describe::<AccessTokenParams, UserInfo>(name, description),
            OpenApi::UserStat => describe::<AccessTokenParams, UserStat>(name, description),
            OpenApi::VideoList | OpenApi::VideoCategories => {
                describe::<AccessTokenParams, JsonObject>(name, description)
            }
        }
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let params: AccessTokenParams = parse_params(arguments)?;
        let (summary, data) = self.execute(params).await?;
        structured_result(summary, &data)
    }
}
