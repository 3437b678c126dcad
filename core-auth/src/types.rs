//! Credential state held by the token manager.

use std::fmt;

/// Access and refresh tokens for the vendor API.
///
/// The access token is optional: the manager starts without one when only a
/// refresh token was configured and fetches one on first use.
///
/// # Examples
///
/// ```
/// use core_auth::Credentials;
///
/// let creds = Credentials::new("1000.refresh").with_access_token("1000.access");
/// assert!(creds.has_access_token());
///
/// // Debug never shows token material
/// assert!(!format!("{:?}", creds).contains("1000."));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Token sent in the `Authorization` header
    pub access_token: Option<String>,
    /// Long-lived token exchanged for new access tokens
    pub refresh_token: String,
}

impl Credentials {
    pub fn new(refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: None,
            refresh_token: refresh_token.into(),
        }
    }

    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    /// An empty string counts as no token
    pub fn has_access_token(&self) -> bool {
        self.access_token
            .as_deref()
            .map(|t| !t.is_empty())
            .unwrap_or(false)
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}
