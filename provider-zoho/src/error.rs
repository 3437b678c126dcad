//! Error types for the Zoho provider

use thiserror::Error;

/// Zoho provider errors
#[derive(Error, Debug)]
pub enum ZohoError {
    /// No usable access token could be obtained
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(#[from] core_auth::AuthError),

    /// The API kept answering 401 after a token refresh
    #[error("Unauthorized after token refresh")]
    Unauthorized,

    /// API request returned an unexpected status
    #[error("Zoho API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] bridge_traits::error::BridgeError),
}

/// Result type for Zoho operations
pub type Result<T> = std::result::Result<T, ZohoError>;

impl From<ZohoError> for bridge_traits::error::BridgeError {
    fn from(error: ZohoError) -> Self {
        match error {
            ZohoError::BridgeError(e) => e,
            other => bridge_traits::error::BridgeError::OperationFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ZohoError::ApiError {
            status_code: 404,
            message: "INVALID_MODULE".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Zoho API error (status 404): INVALID_MODULE"
        );
    }

    #[test]
    fn test_error_conversion() {
        let bridge_error: bridge_traits::error::BridgeError = ZohoError::Unauthorized.into();
        assert!(matches!(
            bridge_error,
            bridge_traits::error::BridgeError::OperationFailed(_)
        ));

        let timeout = bridge_traits::error::BridgeError::Timeout("page".to_string());
        let round_trip: bridge_traits::error::BridgeError = ZohoError::from(timeout).into();
        assert!(matches!(
            round_trip,
            bridge_traits::error::BridgeError::Timeout(_)
        ));
    }
}
