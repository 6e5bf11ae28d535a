//! On-disk OAuth token cache.
//!
//! A single JSON document `{access_token, refresh_token, expires_at,
//! created_at}` (unix seconds), overwritten wholesale on every save.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::domains::tools::ToolError;

/// Tokens are treated as expired this many seconds early.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Stored OAuth grant.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds after which the access token is no longer valid.
    pub expires_at: i64,
    /// Unix seconds when the grant was stored.
    pub created_at: i64,
}

impl std::fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredToken")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl StoredToken {
    /// Build a cache entry from a token grant received at `now`.
    pub fn from_grant(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in_secs: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let created_at = now.timestamp();
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: created_at + expires_in_secs.max(0),
            created_at,
        }
    }

    /// Returns `true` while the access token can still be used at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && self.expires_at - EXPIRY_SKEW_SECS > now.timestamp()
    }
}

/// File-backed token cache.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached token. Absent or unreadable files yield `None`.
    pub fn load(&self) -> Option<StoredToken> {
        trace!(path = %self.path.display(), "Loading token cache");
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(path = %self.path.display(), "Ignoring corrupt token cache: {}", e);
                None
            }
        }
    }

    /// The cached token if it is still valid at `now`.
    pub fn valid_token(&self, now: DateTime<Utc>) -> Option<StoredToken> {
        self.load().filter(|t| t.is_valid_at(now))
    }

    /// Overwrite the cache, creating parent directories as needed.
    pub fn save(&self, token: &StoredToken) -> Result<(), ToolError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ToolError::internal(format!(
                    "failed to create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        let content = serde_json::to_string_pretty(token)
            .map_err(|e| ToolError::internal(format!("failed to serialize token: {}", e)))?;
        std::fs::write(&self.path, content).map_err(|e| {
            ToolError::internal(format!("failed to write {}: {}", self.path.display(), e))
        })?;
        debug!(path = %self.path.display(), expires_at = token.expires_at, "Token cache saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(ts: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(ts, 0).unwrap()
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let cache = TokenCache::new(dir.path().join("token.json"));
        assert!(cache.load().is_none());
    }

    #[test]
    fn test_save_and_load_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let cache = TokenCache::new(dir.path().join("nested").join("token.json"));
        let token = StoredToken::from_grant("acc", "ref", 3600, at(1_000));

        cache.save(&token).unwrap();
        let loaded = cache.load().unwrap();
        assert_eq!(loaded, token);
        assert_eq!(loaded.expires_at, 4_600);
        assert_eq!(loaded.created_at, 1_000);
    }

    #[test]
    fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let cache = TokenCache::new(dir.path().join("token.json"));
        cache
            .save(&StoredToken::from_grant("old", "r1", 10, at(0)))
            .unwrap();
        cache
            .save(&StoredToken::from_grant("new", "r2", 10, at(0)))
            .unwrap();
        assert_eq!(cache.load().unwrap().access_token, "new");
    }

    #[test]
    fn test_corrupt_file_is_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(TokenCache::new(path).load().is_none());
    }

    #[test]
    fn test_validity_window() {
        let token = StoredToken::from_grant("acc", "ref", 3600, at(0));
        assert!(token.is_valid_at(at(0)));
        assert!(token.is_valid_at(at(3_000)));
        // Inside the early-expiry margin.
        assert!(!token.is_valid_at(at(3_590)));
        assert!(!token.is_valid_at(at(10_000)));
    }

    #[test]
    fn test_valid_token_filters_expired() {
        let dir = TempDir::new().unwrap();
        let cache = TokenCache::new(dir.path().join("token.json"));
        cache
            .save(&StoredToken::from_grant("acc", "ref", 100, at(0)))
            .unwrap();
        assert!(cache.valid_token(at(10)).is_some());
        assert!(cache.valid_token(at(1_000)).is_none());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let token = StoredToken::from_grant("secret-access", "secret-refresh", 10, at(0));
        let debug = format!("{:?}", token);
        assert!(!debug.contains("secret-access"));
        assert!(!debug.contains("secret-refresh"));
    }
}
