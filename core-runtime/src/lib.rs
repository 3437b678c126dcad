//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the CRM mirror:
//! - Logging and tracing infrastructure
//! - Configuration management (builder and environment)
//!
//! ## Overview
//!
//! This crate contains the core runtime utilities that other modules depend on.
//! It establishes the configuration surface and the logging conventions used
//! throughout the system.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Cadence, ClientCredentials, CoreConfig, ScheduleConfig};
pub use error::{Error, Result};
