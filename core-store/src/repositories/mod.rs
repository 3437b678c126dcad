//! # Repository Pattern Implementation
//!
//! Repository traits and their SQLite implementations.
//!
//! ## Architecture
//!
//! - Traits define the interface the sync engine depends on
//! - SQLite implementations use sqlx for async database access
//! - All operations return `Result<T>` for error handling
//!
//! ## Available Repositories
//!
//! - `EntityStore` - Mirrored CRM rows, one table per [`Module`](crate::Module),
//!   written through a transactional [`EntityBatch`]

pub mod entity;

pub use entity::{EntityBatch, EntityStore, SqliteEntityBatch, SqliteEntityStore};
