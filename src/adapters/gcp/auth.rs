//! GCP access token acquisition
//!
//! Bearer tokens for the BigQuery and Pub/Sub REST APIs. Tokens come from
//! the `GOOGLE_OAUTH_ACCESS_TOKEN` environment variable when set (local
//! development), otherwise from the GCE metadata server that backs every
//! Cloud Run / Cloud Functions runtime. Metadata tokens are cached until
//! shortly before expiry.

use crate::domain::{BackupError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh this long before the reported expiry to avoid using a token
/// that dies mid-request.
const EXPIRY_MARGIN_SECONDS: i64 = 60;

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Cached bearer-token provider
///
/// Construct once per process and share across clients; the cache is
/// internally synchronized.
pub struct AccessTokenProvider {
    http_client: reqwest::Client,
    metadata_url: String,
    cached: Mutex<Option<CachedToken>>,
}

impl AccessTokenProvider {
    /// Create a provider backed by the default metadata server
    pub fn new() -> Self {
        Self::with_metadata_url(METADATA_TOKEN_URL)
    }

    /// Create a provider with an overridden metadata endpoint (tests)
    pub fn with_metadata_url(metadata_url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            metadata_url: metadata_url.into(),
            cached: Mutex::new(None),
        }
    }

    /// Returns a bearer token, fetching or refreshing as needed
    ///
    /// # Errors
    ///
    /// Returns `BackupError::Authentication` if no token source is
    /// available or the metadata server call fails.
    pub async fn token(&self) -> Result<String> {
        // Explicit token wins; used for local runs and emulator setups.
        if let Ok(token) = std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN") {
            if !token.is_empty() {
                return Ok(token);
            }
        }

        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref() {
            if entry.expires_at > Utc::now() {
                return Ok(entry.token.clone());
            }
        }

        let response = self
            .http_client
            .get(&self.metadata_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| {
                BackupError::Authentication(format!("Metadata server request failed: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(BackupError::Authentication(format!(
                "Metadata server returned status {}",
                response.status()
            )));
        }

        let body: MetadataTokenResponse = response.json().await.map_err(|e| {
            BackupError::Authentication(format!("Invalid metadata token response: {e}"))
        })?;

        let expires_at =
            Utc::now() + Duration::seconds((body.expires_in - EXPIRY_MARGIN_SECONDS).max(0));
        let token = body.access_token.clone();
        *cached = Some(CachedToken {
            token: body.access_token,
            expires_at,
        });

        tracing::debug!(expires_in = body.expires_in, "Fetched metadata access token");
        Ok(token)
    }
}

impl Default for AccessTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::ENV_MUTEX;

    #[tokio::test]
    async fn test_env_token_wins() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::set_var("GOOGLE_OAUTH_ACCESS_TOKEN", "env-token");
        let provider = AccessTokenProvider::with_metadata_url("http://localhost:1/unreachable");
        let token = provider.token().await.unwrap();
        assert_eq!(token, "env-token");
        std::env::remove_var("GOOGLE_OAUTH_ACCESS_TOKEN");
    }

    #[tokio::test]
    async fn test_metadata_token_cached() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::remove_var("GOOGLE_OAUTH_ACCESS_TOKEN");
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/token")
            .match_header("Metadata-Flavor", "Google")
            .with_status(200)
            .with_body(r#"{"access_token": "meta-token", "expires_in": 3600, "token_type": "Bearer"}"#)
            .expect(1)
            .create_async()
            .await;

        let provider = AccessTokenProvider::with_metadata_url(format!("{}/token", server.url()));
        assert_eq!(provider.token().await.unwrap(), "meta-token");
        // Second call must be served from cache.
        assert_eq!(provider.token().await.unwrap(), "meta-token");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_metadata_error_is_authentication_error() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::remove_var("GOOGLE_OAUTH_ACCESS_TOKEN");
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/token")
            .with_status(500)
            .create_async()
            .await;

        let provider = AccessTokenProvider::with_metadata_url(format!("{}/token", server.url()));
        let err = provider.token().await.unwrap_err();
        assert!(matches!(err, BackupError::Authentication(_)));
    }
}
