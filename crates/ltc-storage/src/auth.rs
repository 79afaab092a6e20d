//! Access-token caching for Google APIs (Sheets, Drive, Text-to-Speech).
//!
//! Provides a thread-safe, async-aware token cache with:
//! - Refresh margin to avoid token expiry during requests
//! - Single-flight refresh under a write lock
//! - Fallback to the existing token while it is still usable

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};

/// Refresh margin: refresh token 60 seconds before expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Conservative token TTL when expiry is unknown (50 minutes).
const TOKEN_DEFAULT_TTL: Duration = Duration::from_secs(50 * 60);

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Every scope the backend needs from one service account.
pub const ALL_SCOPES: [&str; 3] = [SHEETS_SCOPE, DRIVE_SCOPE, CLOUD_PLATFORM_SCOPE];

/// Source of bearer tokens for Google REST calls.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> StorageResult<String>;

    /// Drop any cached token so the next call fetches a fresh one.
    async fn invalidate(&self) {}
}

/// Fixed token, for local development against emulators and for tests.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> StorageResult<String> {
        Ok(self.0.clone())
    }
}

/// Load the service account named by `GOOGLE_APPLICATION_CREDENTIALS`.
pub fn service_account_provider() -> StorageResult<Arc<dyn TokenProvider>> {
    let service_account = CustomServiceAccount::from_env().map_err(|e| {
        StorageError::auth_error(format!("Failed to load service account: {}", e))
    })?;

    match service_account {
        Some(sa) => Ok(Arc::new(sa)),
        None => Err(StorageError::auth_error(
            "GOOGLE_APPLICATION_CREDENTIALS not set. \
             Set it to the path of your service account JSON file.",
        )),
    }
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }

    fn is_usable(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Token cache over a gcp_auth provider with single-flight refresh.
pub struct TokenCache {
    auth: Arc<dyn TokenProvider>,
    scopes: Vec<&'static str>,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(auth: Arc<dyn TokenProvider>, scopes: &[&'static str]) -> Self {
        Self {
            auth,
            scopes: scopes.to_vec(),
            cache: RwLock::new(None),
        }
    }

    /// Cache over the environment's service account with every backend scope.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(service_account_provider()?, &ALL_SCOPES))
    }

    /// Get a valid access token, refreshing if necessary.
    pub async fn get_token(&self) -> StorageResult<String> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;

        // Another task may have refreshed while we waited
        if let Some(cached) = cache.as_ref() {
            if cached.is_valid() {
                return Ok(cached.access_token.clone());
            }
        }

        self.refresh_token(&mut cache).await
    }

    async fn refresh_token(&self, cache: &mut Option<CachedToken>) -> StorageResult<String> {
        match self.auth.token(&self.scopes).await {
            Ok(token) => {
                let access_token = token.as_str().to_string();
                let now = Utc::now();
                let exp = token.expires_at();
                let expires_at = if exp > now {
                    match (exp - now).to_std() {
                        Ok(ttl) => Instant::now() + ttl,
                        Err(_) => Instant::now() + TOKEN_DEFAULT_TTL,
                    }
                } else {
                    Instant::now()
                };

                *cache = Some(CachedToken {
                    access_token: access_token.clone(),
                    expires_at,
                });

                debug!(scopes = self.scopes.len(), "Refreshed Google auth token");
                Ok(access_token)
            }
            Err(e) => {
                if let Some(cached) = cache.as_ref() {
                    if cached.is_usable() {
                        warn!("Token refresh failed, using existing token: {}", e);
                        return Ok(cached.access_token.clone());
                    }
                }
                Err(StorageError::auth_error(format!(
                    "Failed to obtain auth token: {}",
                    e
                )))
            }
        }
    }
}

#[async_trait]
impl AccessTokenSource for TokenCache {
    async fn access_token(&self) -> StorageResult<String> {
        self.get_token().await
    }

    async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_token_timing_constants() {
        assert_eq!(TOKEN_REFRESH_MARGIN, Duration::from_secs(60));
        assert_eq!(TOKEN_DEFAULT_TTL, Duration::from_secs(50 * 60));
    }

    #[test]
    fn test_scopes() {
        assert!(ALL_SCOPES.contains(&SHEETS_SCOPE));
        assert!(DRIVE_SCOPE.ends_with("/drive"));
    }

    #[tokio::test]
    async fn test_static_token() {
        let token = StaticToken("abc".into());
        assert_eq!(token.access_token().await.unwrap(), "abc");
    }

    #[test]
    #[serial]
    fn test_service_account_requires_env() {
        std::env::remove_var("GOOGLE_APPLICATION_CREDENTIALS");
        assert!(matches!(
            service_account_provider(),
            Err(StorageError::AuthError(_))
        ));
    }
}
