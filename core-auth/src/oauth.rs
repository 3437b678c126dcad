//! # OAuth 2.0 Refresh Grant
//!
//! Request and response shapes for the accounts token endpoint.
//!
//! ## Overview
//!
//! Zoho issues access tokens that expire after an hour. The mirror keeps a
//! refresh token and trades it in with the `refresh_token` grant:
//!
//! ```text
//! POST https://accounts.zoho.in/oauth/v2/token
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=refresh_token&refresh_token=...&client_id=...&client_secret=...
//! ```
//!
//! The endpoint answers `200` for both success and most failures; a failure
//! body carries `error` instead of `access_token`.

use crate::error::{AuthError, Result};
use core_runtime::config::CoreConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// OAuth client configuration for the refresh grant.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Token exchange endpoint URL
    pub token_url: String,
}

impl OAuthConfig {
    /// Build a config, rejecting an unparsable or non-https token URL.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Result<Self> {
        let token_url = token_url.into();
        let parsed = Url::parse(&token_url)
            .map_err(|e| AuthError::InvalidConfig(format!("Invalid token URL: {}", e)))?;
        if parsed.scheme() != "https" {
            return Err(AuthError::InvalidConfig(format!(
                "Token URL must use https, got '{}'",
                parsed.scheme()
            )));
        }

        Ok(Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url,
        })
    }

    /// Derive from the runtime configuration.
    pub fn from_core_config(config: &CoreConfig) -> Result<Self> {
        Self::new(
            config.credentials.client_id.clone(),
            config.credentials.client_secret.clone(),
            config.token_url(),
        )
    }

    /// Form-encoded body for the refresh grant.
    pub fn refresh_form(&self, refresh_token: &str) -> Result<String> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        serde_urlencoded::to_string(params)
            .map_err(|e| AuthError::Other(format!("Failed to encode token request: {}", e)))
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// Token response from the accounts endpoint.
///
/// Every field is optional so an error body (`{"error": "invalid_code"}`)
/// still decodes and can be told apart from a success.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct TokenResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TokenResponse {
    /// Access token, if the response actually granted one
    pub fn granted_access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Rotated refresh token, if one was issued
    pub fn rotated_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_in", &self.expires_in)
            .field("api_domain", &self.api_domain)
            .field("error", &self.error)
            .finish()
    }
}

fn default_expires_in() -> i64 {
    3600 // Default to 1 hour if not specified
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_config_rejects_bad_url() {
        assert!(OAuthConfig::new("id", "secret", "not a url").is_err());
        assert!(OAuthConfig::new("id", "secret", "http://accounts.zoho.in/oauth/v2/token").is_err());
        assert!(OAuthConfig::new("id", "secret", "https://accounts.zoho.in/oauth/v2/token").is_ok());
    }

    #[test]
    fn test_refresh_form_encodes_all_params() {
        let config =
            OAuthConfig::new("1000.ID", "s&cret", "https://accounts.zoho.in/oauth/v2/token")
                .unwrap();
        let body = config.refresh_form("1000.r/t").unwrap();

        assert!(body.starts_with("grant_type=refresh_token&"));
        assert!(body.contains("refresh_token=1000.r%2Ft"));
        assert!(body.contains("client_id=1000.ID"));
        assert!(body.contains("client_secret=s%26cret"));
    }

    #[test]
    fn test_token_response_deserialization() {
        let json = r#"{
            "access_token": "1000.access",
            "api_domain": "https://www.zohoapis.in",
            "token_type": "Bearer",
            "expires_in": 3600
        }"#;

        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.granted_access_token(), Some("1000.access"));
        assert_eq!(response.rotated_refresh_token(), None);
        assert_eq!(response.expires_in, 3600);
    }

    #[test]
    fn test_token_response_error_body() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"error": "invalid_code"}"#).unwrap();
        assert_eq!(response.granted_access_token(), None);
        assert_eq!(response.error.as_deref(), Some("invalid_code"));
        assert_eq!(response.expires_in, 3600);
    }

    #[test]
    fn test_debug_hides_secret() {
        let config =
            OAuthConfig::new("id", "top-secret", "https://accounts.zoho.in/oauth/v2/token")
                .unwrap();
        assert!(!format!("{:?}", config).contains("top-secret"));
    }
}
