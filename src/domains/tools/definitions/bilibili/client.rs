//! Bilibili open-platform client.
//!
//! Holds the app credentials, the request signer and the token cache. The
//! OAuth grants and the signed API calls all go through here.

use chrono::{DateTime, Utc};
use reqwest::Url;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::core::services::{HttpClient, RequestSigner, StoredToken, TokenCache};
use crate::domains::tools::ToolError;

/// Relay code meaning the authorization session expired.
pub const AUTHORIZATION_EXPIRED: i64 = 86038;

/// `expires_in` values above this are absolute unix timestamps, not durations.
const ABSOLUTE_EXPIRY_THRESHOLD: i64 = 1_000_000_000;

/// Upstream endpoints.
#[derive(Debug, Clone)]
pub struct BilibiliEndpoints {
    pub authorize_url: String,
    pub relay_url: String,
    pub token_url: String,
    pub refresh_url: String,
    pub api_base: String,
}

impl BilibiliEndpoints {
    /// Redirect target registered with the authorization page.
    pub fn callback_url(&self) -> String {
        format!("{}/callback", self.relay_url.trim_end_matches('/'))
    }

    fn code_url(&self) -> String {
        format!("{}/code", self.relay_url.trim_end_matches('/'))
    }
}

/// Standard `{code, message, data}` envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    message: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self, what: &str) -> Result<T, ToolError> {
        if self.code != 0 {
            return Err(ToolError::upstream(format!(
                "{} failed with code {}: {}",
                what,
                self.code,
                self.message.as_deref().unwrap_or("no message")
            )));
        }
        self.data
            .ok_or_else(|| ToolError::upstream(format!("{} returned no data", what)))
    }
}

#[derive(Debug, Deserialize)]
struct Grant {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct RelayCode {
    code: String,
}

/// Result of one relay lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayStatus {
    Code(String),
    Pending,
    Expired,
}

#[derive(Clone)]
pub struct BilibiliClient {
    http: HttpClient,
    signer: RequestSigner,
    client_id: String,
    client_secret: String,
    endpoints: BilibiliEndpoints,
    cache: TokenCache,
}

impl std::fmt::Debug for BilibiliClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BilibiliClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("endpoints", &self.endpoints)
            .field("cache", &self.cache.path())
            .finish()
    }
}

impl BilibiliClient {
    pub fn new(
        http: HttpClient,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        endpoints: BilibiliEndpoints,
        cache: TokenCache,
    ) -> Self {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        Self {
            http,
            signer: RequestSigner::new(client_id.clone(), client_secret.clone()),
            client_id,
            client_secret,
            endpoints,
            cache,
        }
    }

    pub fn endpoints(&self) -> &BilibiliEndpoints {
        &self.endpoints
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Browser URL asking the user to authorize this app.
    pub fn authorize_url(&self, state: &str) -> Result<Url, ToolError> {
        let callback = self.endpoints.callback_url();
        Url::parse_with_params(
            &self.endpoints.authorize_url,
            [
                ("client_id", self.client_id.as_str()),
                ("gourl", callback.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| {
            ToolError::internal(format!(
                "invalid authorize endpoint '{}': {}",
                self.endpoints.authorize_url, e
            ))
        })
    }

    /// Ask the relay whether the code for `state` has arrived.
    pub async fn lookup_code(&self, state: &str) -> Result<RelayStatus, ToolError> {
        let request = self
            .http
            .client()
            .get(self.endpoints.code_url())
            .query(&[("state", state)]);
        let response = self.http.send(request).await?;
        if !response.is_success() {
            debug!(status = response.status.as_u16(), "Relay has no code yet");
            return Ok(RelayStatus::Pending);
        }

        let envelope: Envelope<RelayCode> = response.json()?;
        Ok(match envelope {
            Envelope {
                code: 0,
                data: Some(RelayCode { code }),
                ..
            } if !code.is_empty() => RelayStatus::Code(code),
            Envelope {
                code: AUTHORIZATION_EXPIRED,
                ..
            } => RelayStatus::Expired,
            _ => RelayStatus::Pending,
        })
    }

    /// Exchange an authorization code for tokens and cache them.
    pub async fn exchange_code(&self, code: &str) -> Result<StoredToken, ToolError> {
        let token = self
            .grant(
                &self.endpoints.token_url,
                [("grant_type", "authorization_code"), ("code", code)],
                "token exchange",
            )
            .await?;
        info!("Authorization code exchanged");
        Ok(token)
    }

    /// Run the refresh grant and overwrite the cache.
    pub async fn refresh(&self, refresh_token: &str) -> Result<StoredToken, ToolError> {
        let token = self
            .grant(
                &self.endpoints.refresh_url,
                [
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                ],
                "token refresh",
            )
            .await?;
        info!("Access token refreshed");
        Ok(token)
    }

    async fn grant(
        &self,
        url: &str,
        params: [(&str, &str); 2],
        what: &str,
    ) -> Result<StoredToken, ToolError> {
        let request = self
            .http
            .client()
            .post(url)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .query(&params);
        let envelope: Envelope<Grant> = self.http.send_json(request).await?;
        let grant = envelope.into_data(what)?;

        let token = stored_token(grant, Utc::now());
        self.cache.save(&token)?;
        Ok(token)
    }

    /// Pick the access token for an API call: the explicit one, else a valid
    /// cached one.
    pub fn resolve_token(&self, explicit: Option<&str>) -> Result<String, ToolError> {
        if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
            return Ok(token.to_string());
        }
        self.cache
            .valid_token(Utc::now())
            .map(|t| t.access_token)
            .ok_or_else(|| {
                ToolError::invalid_arguments(
                    "no access_token given and no valid cached token; authorize with bilibili_web_authorize_link first",
                )
            })
    }

    /// Signed GET against the open platform, returning the envelope data.
    pub async fn signed_get<T: DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
    ) -> Result<T, ToolError> {
        let url = format!("{}{}", self.endpoints.api_base.trim_end_matches('/'), path);
        let headers = self.signer.sign("")?;

        let request = self
            .http
            .client()
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header("Access-Token", access_token);
        let request = headers.apply(request);

        debug!(path, "Signed open-platform request");
        let envelope: Envelope<T> = self.http.send_json(request).await?;
        envelope.into_data(path)
    }
}

fn stored_token(grant: Grant, now: DateTime<Utc>) -> StoredToken {
    let expires_in = if grant.expires_in > ABSOLUTE_EXPIRY_THRESHOLD {
        grant.expires_in - now.timestamp()
    } else {
        grant.expires_in
    };
    StoredToken::from_grant(grant.access_token, grant.refresh_token, expires_in, now)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::json;
    use std::time::Duration;

    pub(crate) fn client(server: &MockServer, cache_path: &std::path::Path) -> BilibiliClient {
        BilibiliClient::new(
            HttpClient::new(Duration::from_secs(5)).unwrap(),
            "client-id",
            "client-secret",
            BilibiliEndpoints {
                authorize_url: server.url("/authorize"),
                relay_url: server.url("/relay/"),
                token_url: server.url("/oauth/token"),
                refresh_url: server.url("/oauth/refresh"),
                api_base: server.url(""),
            },
            TokenCache::new(cache_path),
        )
    }

    #[test]
    fn test_envelope_without_message_or_data() {
        let envelope: Envelope<Grant> = serde_json::from_str(r#"{"code": 0}"#).unwrap();
        let err = envelope.into_data("token exchange").unwrap_err();
        assert!(err.to_string().contains("returned no data"));

        let envelope: Envelope<Grant> = serde_json::from_str(r#"{"code": 7}"#).unwrap();
        let err = envelope.into_data("token exchange").unwrap_err();
        assert!(err.to_string().contains("code 7: no message"));
    }

    #[test]
    fn test_authorize_url_carries_callback_and_state() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let url = client(&server, &dir.path().join("t.json"))
            .authorize_url("abc")
            .unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".into(), "client-id".into())));
        assert!(pairs.contains(&("gourl".into(), server.url("/relay/callback"))));
        assert!(pairs.contains(&("state".into(), "abc".into())));
    }

    #[test]
    fn test_absolute_expiry_is_converted() {
        let now = Utc::now();
        let grant = Grant {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_in: now.timestamp() + 7200,
        };
        assert_eq!(stored_token(grant, now).expires_at, now.timestamp() + 7200);

        let grant = Grant {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_in: 3600,
        };
        assert_eq!(stored_token(grant, now).expires_at, now.timestamp() + 3600);
    }

    #[tokio::test]
    async fn test_exchange_code_saves_cache() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/oauth/token")
                .query_param("client_id", "client-id")
                .query_param("client_secret", "client-secret")
                .query_param("grant_type", "authorization_code")
                .query_param("code", "the-code");
            then.status(200).json_body(json!({
                "code": 0,
                "data": {"access_token": "at", "refresh_token": "rt", "expires_in": 3600}
            }));
        });
        let dir = tempfile::tempdir().unwrap();
        let client = client(&server, &dir.path().join("token.json"));

        let token = client.exchange_code("the-code").await.unwrap();

        mock.assert();
        assert_eq!(token.access_token, "at");
        assert_eq!(client.cache().load().unwrap(), token);
    }

    #[tokio::test]
    async fn test_grant_error_code_is_upstream() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/oauth/refresh");
            then.status(200)
                .json_body(json!({"code": -101, "message": "refresh token invalid"}));
        });
        let dir = tempfile::tempdir().unwrap();
        let client = client(&server, &dir.path().join("token.json"));

        let err = client.refresh("stale").await.unwrap_err();
        assert!(matches!(err, ToolError::Upstream(_)));
        assert!(err.to_string().contains("refresh token invalid"));
        assert!(client.cache().load().is_none());
    }

    #[tokio::test]
    async fn test_lookup_code_states() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/relay/code").query_param("state", "ready");
            then.status(200)
                .json_body(json!({"code": 0, "data": {"code": "auth-code"}}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/relay/code").query_param("state", "expired");
            then.status(200)
                .json_body(json!({"code": 86038, "message": "expired"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/relay/code").query_param("state", "waiting");
            then.status(404);
        });
        let dir = tempfile::tempdir().unwrap();
        let client = client(&server, &dir.path().join("token.json"));

        assert_eq!(
            client.lookup_code("ready").await.unwrap(),
            RelayStatus::Code("auth-code".into())
        );
        assert_eq!(client.lookup_code("expired").await.unwrap(), RelayStatus::Expired);
        assert_eq!(client.lookup_code("waiting").await.unwrap(), RelayStatus::Pending);
    }

    #[tokio::test]
    async fn test_signed_get_sends_signature_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/arcopen/fn/user/account/info")
                .header("Access-Token", "token-1")
                .header("X-Bili-Accesskeyid", "client-id")
                .header("X-Bili-Signature-Method", "HMAC-SHA256")
                .header("X-Bili-Content-Md5", "d41d8cd98f00b204e9800998ecf8427e")
                .header_exists("Authorization");
            then.status(200)
                .json_body(json!({"code": 0, "data": {"name": "up"}}));
        });
        let dir = tempfile::tempdir().unwrap();
        let client = client(&server, &dir.path().join("token.json"));

        let data: serde_json::Value = client
            .signed_get("/arcopen/fn/user/account/info", "token-1")
            .await
            .unwrap();

        mock.assert();
        assert_eq!(data["name"], "up");
    }

    #[test]
    fn test_resolve_token_prefers_explicit_then_cache() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let client = client(&server, &dir.path().join("token.json"));

        let err = client.resolve_token(None).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert!(matches!(
            client.resolve_token(Some("  ")).unwrap_err(),
            ToolError::InvalidArguments(_)
        ));

        client
            .cache()
            .save(&StoredToken::from_grant("cached", "r", 3600, Utc::now()))
            .unwrap();
        assert_eq!(client.resolve_token(None).unwrap(), "cached");
        assert_eq!(client.resolve_token(Some("explicit")).unwrap(), "explicit");
    }
}
