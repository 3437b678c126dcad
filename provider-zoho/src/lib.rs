//! # Zoho Bigin Provider
//!
//! Implements `RecordSource` for the Bigin v2 REST API.
//!
//! ## Overview
//!
//! This module provides:
//! - Field discovery through `settings/fields`, with a minimal fallback set
//! - Page-by-page module listing with rate-limit pacing
//! - One token refresh and retry per page on `401`
//! - Early termination that keeps whatever was already fetched

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{ZohoConnector, FALLBACK_FIELDS};
pub use error::{Result, ZohoError};
pub use types::{FieldMeta, FieldsResponse, PageInfo, RecordsPage};
