//! # Authentication Module
//!
//! OAuth 2.0 refresh-token credential manager for the Zoho Bigin API.
//!
//! ## Overview
//!
//! The mirror never runs an interactive authorization flow. It is started
//! with a long-lived refresh token (and optionally a current access token)
//! and exchanges the refresh token for fresh access tokens whenever the API
//! rejects the one it holds.
//!
//! ## Features
//!
//! - Form-encoded refresh against the accounts token endpoint
//! - Serialized refreshes behind an async mutex
//! - `Zoho-oauthtoken` request headers for the API client

pub mod error;
pub mod manager;
pub mod oauth;
pub mod types;

pub use error::{AuthError, Result};
pub use manager::TokenManager;
pub use oauth::{OAuthConfig, TokenResponse};
pub use types::Credentials;
