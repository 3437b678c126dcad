//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (e.g., `core-service` with the reqwest client and the Zoho
//! connector). Host applications can depend on `zoho-mirror-workspace` and
//! enable the documented features without needing to wire each crate
//! individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
