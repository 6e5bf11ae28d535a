//! Toolset selection and registry construction.
//!
//! One process serves exactly one [`Toolset`]. At startup the server builds a
//! [`ToolContext`] holding the shared collaborators and asks
//! [`build_registry`] for the handlers of the selected toolset.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::definitions::{bilibili, ip, location, notification, power, speed, translate, web};
use super::{ToolHandler, ToolRegistry};
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::services::{CommandRunner, HttpClient, TaskScheduler};

/// A cohesive group of tools served by one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Toolset {
    SpeedTester,
    Location,
    IpQuery,
    Translate,
    Web,
    Notification,
    Power,
    Bilibili,
}

impl Toolset {
    pub const ALL: [Toolset; 8] = [
        Toolset::SpeedTester,
        Toolset::Location,
        Toolset::IpQuery,
        Toolset::Translate,
        Toolset::Web,
        Toolset::Notification,
        Toolset::Power,
        Toolset::Bilibili,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Toolset::SpeedTester => "speed-tester",
            Toolset::Location => "location",
            Toolset::IpQuery => "ip-query",
            Toolset::Translate => "translate",
            Toolset::Web => "web",
            Toolset::Notification => "notification",
            Toolset::Power => "power",
            Toolset::Bilibili => "bilibili",
        }
    }

    /// Names accepted by `MCP_TOOLSET`.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(Toolset::as_str).collect()
    }

    /// Server instructions reported during initialization.
    pub fn description(&self) -> &'static str {
        match self {
            Toolset::SpeedTester => {
                "Network diagnostics: latency, download and upload speed tests, and URL reachability checks."
            }
            Toolset::Location => {
                "Obtains the user's geographic coordinates through a browser consent page."
            }
            Toolset::IpQuery => "Looks up the public IP address and IP geolocation.",
            Toolset::Translate => {
                "Text translation through the Baidu translation API, including prompt translation for image generation."
            }
            Toolset::Web => "Opens web pages and search engine results in the default browser.",
            Toolset::Notification => {
                "Desktop notifications, immediate, delayed or repeating, with task management."
            }
            Toolset::Power => {
                "Shutdown, restart, sleep, hibernate, screen lock and display off, immediate or scheduled, with cancellation."
            }
            Toolset::Bilibili => {
                "Bilibili open platform: web OAuth authorization, token cache, user and video queries."
            }
        }
    }

    /// Credential variables that must be set to serve this toolset.
    pub fn required_credentials(&self) -> &'static [&'static str] {
        match self {
            Toolset::IpQuery => &["ALIYUN_IP_API_KEY"],
            Toolset::Translate => &["BAIDU_TRANSLATE_APP_ID", "BAIDU_TRANSLATE_APP_KEY"],
            Toolset::Bilibili => &["BILIBILI_CLIENT_ID", "BILIBILI_CLIENT_SECRET"],
            _ => &[],
        }
    }
}

impl fmt::Display for Toolset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Toolset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| {
                Error::config(format!(
                    "unknown toolset '{}' (expected one of: {})",
                    s,
                    Self::names().join(", ")
                ))
            })
    }
}

/// Collaborators shared by the handlers of one process.
#[derive(Clone)]
pub struct ToolContext {
    pub config: Arc<Config>,
    pub http: HttpClient,
    pub runner: Arc<dyn CommandRunner>,
    pub scheduler: TaskScheduler,
}

impl ToolContext {
    /// Build a context with a fresh HTTP client and scheduler.
    pub fn new(config: Arc<Config>, runner: Arc<dyn CommandRunner>) -> Result<Self> {
        let http = HttpClient::new(config.runtime.http_timeout())?;
        Ok(Self {
            config,
            http,
            runner,
            scheduler: TaskScheduler::new(),
        })
    }
}

/// Instantiate every handler of `toolset`, in advertisement order.
pub fn handlers_for(toolset: Toolset, ctx: &ToolContext) -> Result<Vec<Arc<dyn ToolHandler>>> {
    let handlers = match toolset {
        Toolset::SpeedTester => speed::handlers(ctx),
        Toolset::Location => location::handlers(ctx),
        Toolset::IpQuery => ip::handlers(ctx)?,
        Toolset::Translate => translate::handlers(ctx)?,
        Toolset::Web => web::handlers(ctx),
        Toolset::Notification => notification::handlers(ctx),
        Toolset::Power => power::handlers(ctx),
        Toolset::Bilibili => bilibili::handlers(ctx)?,
    };
    Ok(handlers)
}

/// Build the registry for `toolset`.
pub fn build_registry(toolset: Toolset, ctx: &ToolContext) -> Result<ToolRegistry> {
    let registry = ToolRegistry::with_tools(handlers_for(toolset, ctx)?)?;
    info!(
        toolset = %toolset,
        tools = registry.len(),
        "Tool registry built: {}",
        registry.tool_names().join(", ")
    );
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::services::DryRunRunner;

    fn context(toolset: Toolset) -> ToolContext {
        let mut config = Config::for_toolset(toolset);
        config.credentials.aliyun_ip_api_key = Some("appcode".to_string());
        config.credentials.baidu_app_id = Some("appid".to_string());
        config.credentials.baidu_app_key = Some("appkey".to_string());
        config.credentials.bilibili_client_id = Some("cid".to_string());
        config.credentials.bilibili_client_secret = Some("secret".to_string());
        ToolContext::new(Arc::new(config), Arc::new(DryRunRunner::new())).unwrap()
    }

    #[test]
    fn test_names_round_trip() {
        for toolset in Toolset::ALL {
            assert_eq!(toolset.as_str().parse::<Toolset>().unwrap(), toolset);
            assert_eq!(toolset.to_string(), toolset.as_str());
        }
        assert_eq!(" IP-Query ".parse::<Toolset>().unwrap(), Toolset::IpQuery);
    }

    #[test]
    fn test_unknown_toolset_lists_choices() {
        let err = "weather".parse::<Toolset>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("weather"));
        assert!(msg.contains("speed-tester"));
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&Toolset::SpeedTester).unwrap();
        assert_eq!(json, "\"speed-tester\"");
    }

    #[test]
    fn test_required_credentials() {
        assert!(Toolset::Web.required_credentials().is_empty());
        assert_eq!(Toolset::IpQuery.required_credentials(), ["ALIYUN_IP_API_KEY"]);
        assert_eq!(Toolset::Bilibili.required_credentials().len(), 2);
    }

    #[tokio::test]
    async fn test_every_toolset_builds_with_unique_names() {
        let expected: [(Toolset, &[&str]); 8] = [
            (Toolset::SpeedTester, &["test_network_speed", "check_url"]),
            (Toolset::Location, &["get_location"]),
            (Toolset::IpQuery, &["get_my_ip", "get_ip_location"]),
            (
                Toolset::Translate,
                &["translate_text", "get_supported_languages", "translate_prompt"],
            ),
            (Toolset::Web, &["open_web", "web_search"]),
            (
                Toolset::Notification,
                &[
                    "send_notification",
                    "stop_repeat_notification",
                    "stop_all_repeat_notifications",
                    "list_active_notifications",
                    "get_notification_info",
                    "notification_task_management",
                ],
            ),
            (
                Toolset::Power,
                &[
                    "shutdown_system",
                    "restart_system",
                    "sleep_system",
                    "hibernate_system",
                    "lock_screen",
                    "turn_off_display",
                    "cancel_power_action",
                    "list_power_actions",
                ],
            ),
            (
                Toolset::Bilibili,
                &[
                    "bilibili_check_local_token",
                    "bilibili_web_authorize_link",
                    "bilibili_web_poll_and_token",
                    "bilibili_refresh_token",
                    "bilibili_get_user_info",
                    "bilibili_get_user_stat",
                    "bilibili_get_video_list",
                    "bilibili_get_video_categories",
                ],
            ),
        ];

        for (toolset, names) in expected {
            let registry = build_registry(toolset, &context(toolset)).unwrap();
            assert_eq!(registry.tool_names(), names.to_vec(), "toolset {}", toolset);
            for tool in registry.list() {
                assert!(tool.description.is_some());
                assert_eq!(
                    tool.input_schema.get("type").and_then(|t| t.as_str()),
                    Some("object"),
                    "tool {}",
                    tool.name
                );
            }
        }
    }

    #[test]
    fn test_missing_credentials_fail_registry_build() {
        let config = Config::for_toolset(Toolset::Translate);
        let ctx = ToolContext::new(Arc::new(config), Arc::new(DryRunRunner::new())).unwrap();
        let err = build_registry(Toolset::Translate, &ctx).err().unwrap();
        assert!(err.to_string().contains("BAIDU_TRANSLATE_APP_ID"));
    }
}
