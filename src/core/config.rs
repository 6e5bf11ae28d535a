//! Configuration management for the tool servers.
//!
//! Configuration is read once at startup from environment variables (and an
//! optional `.env` file). Loading fails when the selected toolset is missing
//! or when one of its mandatory credentials is absent.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{Error, Result};
use super::services::PollPolicy;
use super::transport::TransportConfig;
use crate::domains::tools::Toolset;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// The toolset this process serves.
    pub toolset: Toolset,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Timeouts, polling policy and dry-run switch.
    pub runtime: RuntimeConfig,

    /// Upstream provider endpoints.
    pub endpoints: EndpointsConfig,

    /// External API credentials.
    pub credentials: CredentialsConfig,

    /// Local durable state.
    pub storage: StorageConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

/// Timeouts and polling behaviour shared by all handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Outbound HTTP request timeout in seconds.
    pub http_timeout_secs: u64,

    /// Local command timeout in seconds.
    pub command_timeout_secs: u64,

    /// Attempts made by polling handlers before giving up.
    pub poll_max_attempts: u32,

    /// Fixed delay between polling attempts in milliseconds.
    pub poll_interval_ms: u64,

    /// Log local commands instead of running them.
    pub dry_run: bool,
}

impl RuntimeConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            self.poll_max_attempts,
            Duration::from_millis(self.poll_interval_ms),
        )
    }
}

/// Upstream endpoints. Defaults point at the production providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Browser page that asks the user for location consent.
    pub location_page_url: String,
    /// Key-value endpoint the page publishes coordinates to.
    pub location_api_url: String,
    /// Public IP echo endpoint.
    pub my_ip_url: String,
    /// IP geolocation endpoint (Aliyun market).
    pub ip_location_url: String,
    /// Baidu general translation endpoint.
    pub baidu_translate_url: String,
    /// Bilibili web authorization page.
    pub bilibili_authorize_url: String,
    /// Relay that receives the OAuth redirect and exposes the code by state.
    pub bilibili_relay_url: String,
    /// Authorization-code grant endpoint.
    pub bilibili_token_url: String,
    /// Refresh grant endpoint.
    pub bilibili_refresh_url: String,
    /// Base URL of the signed open-platform API.
    pub bilibili_api_base: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            location_page_url: "https://location.mcpcn.ai".to_string(),
            location_api_url: "https://mcpcn.cc/api/map/getCoordinates".to_string(),
            my_ip_url: "https://www.ipplus360.com/getIP".to_string(),
            ip_location_url: "https://kzipglobal.market.alicloudapi.com/api/ip/query".to_string(),
            baidu_translate_url: "https://fanyi-api.baidu.com/api/trans/vip/translate"
                .to_string(),
            bilibili_authorize_url: "https://account.bilibili.com/pc/account-pc/auth/oauth"
                .to_string(),
            bilibili_relay_url: "https://mcpcn.cc/api/bilibili/oauth".to_string(),
            bilibili_token_url: "https://api.bilibili.com/x/account-oauth2/v1/token".to_string(),
            bilibili_refresh_url: "https://api.bilibili.com/x/account-oauth2/v1/refresh_token"
                .to_string(),
            bilibili_api_base: "https://member.bilibili.com".to_string(),
        }
    }
}

/// Configuration for external API credentials.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// AppCode for the Aliyun IP geolocation API.
    pub aliyun_ip_api_key: Option<String>,
    /// Baidu translate app id.
    pub baidu_app_id: Option<String>,
    /// Baidu translate secret key.
    pub baidu_app_key: Option<String>,
    /// Bilibili open platform client id.
    pub bilibili_client_id: Option<String>,
    /// Bilibili open platform client secret.
    pub bilibili_client_secret: Option<String>,
}

impl CredentialsConfig {
    /// Look up a credential by its environment variable name.
    pub fn get(&self, var: &str) -> Option<&str> {
        let value = match var {
            "ALIYUN_IP_API_KEY" => &self.aliyun_ip_api_key,
            "BAIDU_TRANSLATE_APP_ID" => &self.baidu_app_id,
            "BAIDU_TRANSLATE_APP_KEY" => &self.baidu_app_key,
            "BILIBILI_CLIENT_ID" => &self.bilibili_client_id,
            "BILIBILI_CLIENT_SECRET" => &self.bilibili_client_secret,
            _ => return None,
        };
        value.as_deref()
    }

    /// Like [`get`](Self::get) but fails with a configuration error.
    pub fn require(&self, var: &str) -> Result<&str> {
        self.get(var)
            .ok_or_else(|| Error::config(format!("{} must be set", var)))
    }
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("CredentialsConfig")
            .field("aliyun_ip_api_key", &redact(&self.aliyun_ip_api_key))
            .field("baidu_app_id", &self.baidu_app_id)
            .field("baidu_app_key", &redact(&self.baidu_app_key))
            .field("bilibili_client_id", &self.bilibili_client_id)
            .field("bilibili_client_secret", &redact(&self.bilibili_client_secret))
            .finish()
    }
}

/// Local durable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bilibili token cache file.
    pub bilibili_token_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        Self {
            bilibili_token_path: PathBuf::from(home).join(".bilibili_mcp_token.json"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let toolset = Toolset::SpeedTester;
        Self {
            server: ServerConfig {
                name: format!("mcp-{}", toolset),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            toolset,
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            transport: TransportConfig::default(),
            runtime: RuntimeConfig {
                http_timeout_secs: 15,
                command_timeout_secs: 30,
                poll_max_attempts: 60,
                poll_interval_ms: 2_000,
                dry_run: false,
            },
            endpoints: EndpointsConfig::default(),
            credentials: CredentialsConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Create a configuration for `toolset` with default values.
    pub fn for_toolset(toolset: Toolset) -> Self {
        let mut config = Self::default();
        config.toolset = toolset;
        config.server.name = format!("mcp-{}", toolset);
        config
    }

    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let toolset: Toolset = get("MCP_TOOLSET")
            .ok_or_else(|| {
                Error::config(format!(
                    "MCP_TOOLSET is not set (expected one of: {})",
                    Toolset::names().join(", ")
                ))
            })?
            .parse()?;

        let mut config = Self::for_toolset(toolset);

        if let Some(name) = get("MCP_SERVER_NAME") {
            config.server.name = name;
        }
        if let Some(level) = get("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.transport = TransportConfig::from_lookup(&get)?;

        let runtime = &mut config.runtime;
        runtime.http_timeout_secs =
            parse_or(&get, "MCP_HTTP_TIMEOUT_SECS", runtime.http_timeout_secs)?;
        runtime.command_timeout_secs =
            parse_or(&get, "MCP_COMMAND_TIMEOUT_SECS", runtime.command_timeout_secs)?;
        runtime.poll_max_attempts =
            parse_or(&get, "MCP_POLL_MAX_ATTEMPTS", runtime.poll_max_attempts)?;
        runtime.poll_interval_ms = parse_or(&get, "MCP_POLL_INTERVAL_MS", runtime.poll_interval_ms)?;
        if let Some(v) = get("MCP_DRY_RUN") {
            runtime.dry_run = parse_bool("MCP_DRY_RUN", &v)?;
        }

        config.credentials = CredentialsConfig {
            aliyun_ip_api_key: get("ALIYUN_IP_API_KEY"),
            baidu_app_id: get("BAIDU_TRANSLATE_APP_ID"),
            baidu_app_key: get("BAIDU_TRANSLATE_APP_KEY"),
            bilibili_client_id: get("BILIBILI_CLIENT_ID"),
            bilibili_client_secret: get("BILIBILI_CLIENT_SECRET"),
        };

        if let Some(path) = get("BILIBILI_TOKEN_PATH") {
            config.storage.bilibili_token_path = PathBuf::from(path);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the selected toolset has everything it needs.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = self
            .toolset
            .required_credentials()
            .iter()
            .copied()
            .filter(|var| self.credentials.get(var).is_none())
            .collect();

        if !missing.is_empty() {
            return Err(Error::config(format!(
                "the {} toolset requires {} to be set",
                self.toolset,
                missing.join(", ")
            )));
        }

        if self.runtime.http_timeout_secs == 0 || self.runtime.command_timeout_secs == 0 {
            return Err(Error::config("timeouts must be greater than zero"));
        }
        Ok(())
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(v) => v
            .parse()
            .map_err(|e| Error::config(format!("{}: invalid value '{}': {}", key, v, e))),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::config(format!(
            "{}: expected a boolean, got '{}'",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // Mutex to ensure env var tests run serially
    static ENV_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_toolset_is_required() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("MCP_TOOLSET"));
    }

    #[test]
    fn test_unknown_toolset() {
        let err = load(&[("MCP_TOOLSET", "weather")]).unwrap_err();
        assert!(err.to_string().contains("weather"));
    }

    #[test]
    fn test_defaults_for_credential_free_toolset() {
        let config = load(&[("MCP_TOOLSET", "speed-tester")]).unwrap();
        assert_eq!(config.toolset, Toolset::SpeedTester);
        assert_eq!(config.server.name, "mcp-speed-tester");
        assert_eq!(config.runtime.http_timeout(), Duration::from_secs(15));
        assert_eq!(config.runtime.poll_policy(), PollPolicy::default());
        assert!(!config.runtime.dry_run);
    }

    #[test]
    fn test_missing_credentials_are_fatal() {
        let err = load(&[("MCP_TOOLSET", "translate"), ("BAIDU_TRANSLATE_APP_ID", "id")])
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("BAIDU_TRANSLATE_APP_KEY"));
        assert!(!msg.contains("BAIDU_TRANSLATE_APP_ID,"));
    }

    #[test]
    fn test_blank_credentials_count_as_missing() {
        let err = load(&[("MCP_TOOLSET", "ip-query"), ("ALIYUN_IP_API_KEY", "  ")]).unwrap_err();
        assert!(err.to_string().contains("ALIYUN_IP_API_KEY"));
    }

    #[test]
    fn test_credentials_loaded() {
        let config = load(&[
            ("MCP_TOOLSET", "bilibili"),
            ("BILIBILI_CLIENT_ID", "cid"),
            ("BILIBILI_CLIENT_SECRET", "csecret"),
            ("BILIBILI_TOKEN_PATH", "/tmp/token.json"),
        ])
        .unwrap();
        assert_eq!(config.credentials.get("BILIBILI_CLIENT_ID"), Some("cid"));
        assert_eq!(
            config.storage.bilibili_token_path,
            PathBuf::from("/tmp/token.json")
        );
    }

    #[test]
    fn test_runtime_overrides() {
        let config = load(&[
            ("MCP_TOOLSET", "location"),
            ("MCP_POLL_MAX_ATTEMPTS", "5"),
            ("MCP_POLL_INTERVAL_MS", "10"),
            ("MCP_DRY_RUN", "true"),
            ("MCP_SERVER_NAME", "where-am-i"),
        ])
        .unwrap();
        assert_eq!(
            config.runtime.poll_policy(),
            PollPolicy::new(5, Duration::from_millis(10))
        );
        assert!(config.runtime.dry_run);
        assert_eq!(config.server.name, "where-am-i");
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let err = load(&[("MCP_TOOLSET", "web"), ("MCP_HTTP_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("MCP_HTTP_TIMEOUT_SECS"));
    }

    #[test]
    fn test_credentials_redacted_in_debug() {
        let creds = CredentialsConfig {
            aliyun_ip_api_key: Some("super_secret_key".to_string()),
            bilibili_client_secret: Some("another_secret".to_string()),
            ..Default::default()
        };
        let debug_str = format!("{:?}", creds);
        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("super_secret_key"));
        assert!(!debug_str.contains("another_secret"));
    }

    #[test]
    fn test_from_env_reads_process_environment() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_TOOLSET", "notification");
            std::env::set_var("MCP_COMMAND_TIMEOUT_SECS", "7");
        }
        let config = Config::from_env().unwrap();
        assert_eq!(config.toolset, Toolset::Notification);
        assert_eq!(config.runtime.command_timeout(), Duration::from_secs(7));
        unsafe {
            std::env::remove_var("MCP_TOOLSET");
            std::env::remove_var("MCP_COMMAND_TIMEOUT_SECS");
        }
    }
}
