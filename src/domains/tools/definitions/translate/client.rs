//! Baidu general translation API client.
//!
//! Requests are GETs signed with `md5(appid + q + salt + key)`. The provider
//! answers 200 in both cases: either `{from, to, trans_result: [{src, dst}]}`
//! or `{error_code, error_msg}`.

use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::services::{HttpClient, md5_hex};
use crate::domains::tools::ToolError;

/// Source language meaning "detect automatically".
pub const AUTO: &str = "auto";

#[derive(Debug, Deserialize)]
struct Segment {
    dst: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BaiduResponse {
    Failure {
        error_code: Value,
        #[serde(default)]
        error_msg: String,
    },
    Success {
        from: String,
        to: String,
        trans_result: Vec<Segment>,
    },
}

/// A completed translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    /// Source language, as detected by the provider when `auto` was requested.
    pub from: String,
    pub to: String,
}

#[derive(Clone)]
pub struct BaiduTranslator {
    http: HttpClient,
    url: String,
    app_id: String,
    app_key: String,
}

impl std::fmt::Debug for BaiduTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaiduTranslator")
            .field("url", &self.url)
            .field("app_id", &self.app_id)
            .field("app_key", &"[REDACTED]")
            .finish()
    }
}

impl BaiduTranslator {
    pub fn new(
        http: HttpClient,
        url: impl Into<String>,
        app_id: impl Into<String>,
        app_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            app_id: app_id.into(),
            app_key: app_key.into(),
        }
    }

    /// Request signature for `text` and `salt`.
    pub fn sign(&self, text: &str, salt: &str) -> String {
        md5_hex(format!("{}{}{}{}", self.app_id, text, salt, self.app_key))
    }

    pub async fn translate(&self, text: &str, from: &str, to: &str) -> Result<Translation, ToolError> {
        let salt = rand::thread_rng().gen_range(0..10_000_000u32).to_string();
        let sign = self.sign(text, &salt);

        debug!(from, to, chars = text.chars().count(), "Calling Baidu translate");
        let request = self.http.client().get(&self.url).query(&[
            ("q", text),
            ("from", from),
            ("to", to),
            ("appid", self.app_id.as_str()),
            ("salt", salt.as_str()),
            ("sign", sign.as_str()),
        ]);

        match self.http.send_json::<BaiduResponse>(request).await? {
            BaiduResponse::Success {
                from,
                to,
                trans_result,
            } => Ok(Translation {
                text: trans_result
                    .into_iter()
                    .map(|s| s.dst)
                    .collect::<Vec<_>>()
                    .join("\n"),
                from,
                to,
            }),
            BaiduResponse::Failure {
                error_code,
                error_msg,
            } => {
                let code = match error_code {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                warn!(code = %code, "Baidu translate rejected the request: {}", error_msg);
                Err(ToolError::upstream(format!(
                    "translation API error {}: {}",
                    code, error_msg
                )))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use serde_json::json;
    use std::time::Duration;

    pub(crate) fn translator(server: &MockServer) -> BaiduTranslator {
        BaiduTranslator::new(
            HttpClient::new(Duration::from_secs(5)).unwrap(),
            server.url("/api/trans/vip/translate"),
            "20240001",
            "app-key",
        )
    }

    #[test]
    fn test_sign_matches_provider_formula() {
        let server = MockServer::start();
        let t = translator(&server);
        assert_eq!(
            t.sign("apple", "1435660288"),
            md5_hex("20240001apple1435660288app-key")
        );
    }

    #[tokio::test]
    async fn test_joins_segments() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/trans/vip/translate")
                .query_param("q", "你好\n世界")
                .query_param("from", "auto")
                .query_param("to", "en")
                .query_param("appid", "20240001")
                .query_param_exists("salt")
                .query_param_exists("sign");
            then.status(200).json_body(json!({
                "from": "zh",
                "to": "en",
                "trans_result": [{"src": "你好", "dst": "Hello"}, {"src": "世界", "dst": "World"}]
            }));
        });

        let translation = translator(&server)
            .translate("你好\n世界", AUTO, "en")
            .await
            .unwrap();

        mock.assert();
        assert_eq!(translation.text, "Hello\nWorld");
        assert_eq!(translation.from, "zh");
    }

    #[tokio::test]
    async fn test_provider_error_code_is_reported() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/trans/vip/translate");
            then.status(200)
                .json_body(json!({"error_code": "54001", "error_msg": "Invalid Sign"}));
        });

        let err = translator(&server)
            .translate("hi", AUTO, "zh")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Upstream(_)));
        assert!(err.to_string().contains("54001"));
        assert!(err.to_string().contains("Invalid Sign"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let server = MockServer::start();
        assert!(!format!("{:?}", translator(&server)).contains("app-key"));
    }
}
