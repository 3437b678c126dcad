//! # Local Mirror Store
//!
//! Owns the mirror database and provides the repository used by the
//! reconciler.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite connection pooling and embedded migrations
//! - One table per CRM module, keyed by the vendor record id (`zoho_id`)
//! - Batched, transactional writes through [`EntityBatch`]

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{Result, StoreError};
pub use models::{ColumnValue, EntityRecord, Module, StoredEntity};
pub use repositories::{EntityBatch, EntityStore, SqliteEntityBatch, SqliteEntityStore};
