//! # Token Manager
//!
//! Owns the OAuth credentials for one vendor account and refreshes them on
//! demand.
//!
//! ## Overview
//!
//! The `TokenManager` is shared behind an `Arc` between the API connector and
//! the service façade. Reads of the current access token take a shared lock;
//! a refresh takes an exclusive async mutex so two callers never hit the token
//! endpoint at once.
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::{Credentials, OAuthConfig, TokenManager};
//! use std::sync::Arc;
//! # use bridge_traits::http::HttpClient;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let http_client: Arc<dyn HttpClient> = todo!();
//! let config = OAuthConfig::new(
//!     "1000.CLIENT",
//!     "secret",
//!     "https://accounts.zoho.in/oauth/v2/token",
//! )?;
//! let manager = TokenManager::new(config, Credentials::new("1000.refresh"), http_client);
//!
//! // Refreshes first because no access token is held yet
//! let headers = manager.headers().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::oauth::{OAuthConfig, TokenResponse};
use crate::types::Credentials;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bytes::Bytes;
use core_runtime::config::CoreConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// Timeout for a single token endpoint call
const REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum number of error-body characters echoed into logs
const ERROR_BODY_SNIPPET: usize = 400;

pub struct TokenManager {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
    credentials: RwLock<Credentials>,
    /// Serializes refreshes
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(
        config: OAuthConfig,
        credentials: Credentials,
        http_client: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            config,
            http_client,
            credentials: RwLock::new(credentials),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Build from the runtime configuration, seeding the optional access token.
    pub fn from_core_config(config: &CoreConfig, http_client: Arc<dyn HttpClient>) -> Result<Self> {
        let oauth = OAuthConfig::from_core_config(config)?;
        let mut credentials = Credentials::new(config.credentials.refresh_token.clone());
        if let Some(token) = &config.credentials.access_token {
            credentials = credentials.with_access_token(token.clone());
        }
        Ok(Self::new(oauth, credentials, http_client))
    }

    /// Current access token, if one is held
    pub async fn access_token(&self) -> Option<String> {
        let credentials = self.credentials.read().await;
        if credentials.has_access_token() {
            credentials.access_token.clone()
        } else {
            None
        }
    }

    /// Snapshot of the held credentials
    pub async fn credentials(&self) -> Credentials {
        self.credentials.read().await.clone()
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Returns `true` only when the endpoint answered 200 with an
    /// `access_token`. On any failure the held credentials are unchanged.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> bool {
        let _guard = self.refresh_lock.lock().await;

        let refresh_token = self.credentials.read().await.refresh_token.clone();
        let body = match self.config.refresh_form(&refresh_token) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Could not build token refresh request");
                return false;
            }
        };

        debug!("Refreshing access token");

        let request = HttpRequest::new(HttpMethod::Post, self.config.token_url.clone())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from(body))
            .timeout(REFRESH_TIMEOUT);

        let response = match self.http_client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token refresh request failed");
                return false;
            }
        };

        if response.status != 200 {
            warn!(
                status = response.status,
                body = %response.text_snippet(ERROR_BODY_SNIPPET),
                "Token refresh rejected"
            );
            return false;
        }

        let token_response: TokenResponse = match response.json() {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Token refresh returned an undecodable body");
                return false;
            }
        };

        let Some(access_token) = token_response.granted_access_token() else {
            warn!(
                error = token_response.error.as_deref().unwrap_or("missing access_token"),
                "Token refresh returned no access token"
            );
            return false;
        };

        let mut credentials = self.credentials.write().await;
        credentials.access_token = Some(access_token.to_string());
        if let Some(rotated) = token_response.rotated_refresh_token() {
            credentials.refresh_token = rotated.to_string();
        }

        info!(
            expires_in = token_response.expires_in,
            "Access token refreshed"
        );
        true
    }

    /// Headers for an authenticated API call.
    ///
    /// Refreshes once when no access token is held.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotAuthenticated`] if there is still no token
    /// after the refresh attempt.
    pub async fn headers(&self) -> Result<HashMap<String, String>> {
        let token = match self.access_token().await {
            Some(token) => token,
            None => {
                self.refresh().await;
                self.access_token()
                    .await
                    .ok_or(AuthError::NotAuthenticated)?
            }
        };

        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Zoho-oauthtoken {}", token),
        );
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Ok(headers)
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::HttpResponse;
    use mockall::mock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    const TOKEN_URL: &str = "https://accounts.zoho.in/oauth/v2/token";

    fn manager_with(mock: MockHttpClient, credentials: Credentials) -> TokenManager {
        let config = OAuthConfig::new("1000.CLIENT", "secret", TOKEN_URL).unwrap();
        TokenManager::new(config, credentials, Arc::new(mock))
    }

    #[tokio::test]
    async fn test_refresh_success_replaces_both_tokens() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .withf(|req| {
                let body = req
                    .body
                    .as_ref()
                    .map(|b| String::from_utf8_lossy(b).to_string())
                    .unwrap_or_default();
                req.method == HttpMethod::Post
                    && req.url == TOKEN_URL
                    && req.headers.get("Content-Type").map(String::as_str)
                        == Some("application/x-www-form-urlencoded")
                    && req.timeout == Some(REFRESH_TIMEOUT)
                    && body.contains("grant_type=refresh_token")
                    && body.contains("refresh_token=old-refresh")
            })
            .returning(|_| {
                Ok(HttpResponse::new(
                    200,
                    r#"{"access_token":"new-access","refresh_token":"new-refresh","expires_in":3600}"#,
                ))
            });

        let manager = manager_with(mock, Credentials::new("old-refresh"));
        assert!(manager.refresh().await);

        let creds = manager.credentials().await;
        assert_eq!(creds.access_token.as_deref(), Some("new-access"));
        assert_eq!(creds.refresh_token, "new-refresh");
    }

    #[tokio::test]
    async fn test_refresh_keeps_refresh_token_when_not_rotated() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .returning(|_| Ok(HttpResponse::new(200, r#"{"access_token":"new-access"}"#)));

        let manager = manager_with(mock, Credentials::new("keep-me"));
        assert!(manager.refresh().await);
        assert_eq!(manager.credentials().await.refresh_token, "keep-me");
    }

    #[tokio::test]
    async fn test_refresh_200_with_error_body_fails() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .returning(|_| Ok(HttpResponse::new(200, r#"{"error":"invalid_code"}"#)));

        let manager = manager_with(
            mock,
            Credentials::new("refresh").with_access_token("stale-access"),
        );
        assert!(!manager.refresh().await);
        assert_eq!(
            manager.access_token().await.as_deref(),
            Some("stale-access")
        );
    }

    #[tokio::test]
    async fn test_refresh_non_200_and_transport_failures() {
        let mut mock = MockHttpClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        mock.expect_execute().returning(move |_| {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(HttpResponse::new(400, r#"{"error":"invalid_client"}"#)),
                1 => Err(BridgeError::Timeout("token endpoint".to_string())),
                _ => Ok(HttpResponse::new(200, "not json")),
            }
        });

        let manager = manager_with(mock, Credentials::new("refresh"));
        assert!(!manager.refresh().await);
        assert!(!manager.refresh().await);
        assert!(!manager.refresh().await);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(manager.access_token().await.is_none());
    }

    #[tokio::test]
    async fn test_headers_with_held_token_skip_refresh() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(0);

        let manager = manager_with(
            mock,
            Credentials::new("refresh").with_access_token("1000.held"),
        );
        let headers = manager.headers().await.unwrap();

        assert_eq!(
            headers.get("Authorization").map(String::as_str),
            Some("Zoho-oauthtoken 1000.held")
        );
        assert_eq!(
            headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
    }

    #[tokio::test]
    async fn test_headers_refresh_once_when_missing() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"access_token":"fresh"}"#)));

        let manager = manager_with(mock, Credentials::new("refresh"));
        let headers = manager.headers().await.unwrap();
        assert_eq!(
            headers.get("Authorization").map(String::as_str),
            Some("Zoho-oauthtoken fresh")
        );
    }

    #[tokio::test]
    async fn test_headers_not_authenticated_when_refresh_fails() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(401, "")));

        let manager = manager_with(mock, Credentials::new("revoked"));
        let err = manager.headers().await.unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_from_core_config_seeds_access_token() {
        let config = CoreConfig::builder()
            .client_id("1000.CLIENT")
            .client_secret("secret")
            .refresh_token("1000.refresh")
            .access_token("1000.access")
            .build()
            .unwrap();

        let manager = TokenManager::from_core_config(&config, Arc::new(MockHttpClient::new()))
            .unwrap();
        assert_eq!(manager.access_token().await.as_deref(), Some("1000.access"));
        assert_eq!(manager.config.token_url, TOKEN_URL);
    }
}
