//! # Core Configuration Module
//!
//! Provides configuration management for the Zoho Bigin mirror.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds every setting the sync engine needs: OAuth client
//! credentials, vendor hosts, pacing, the local database path, reconciliation
//! tuning and the schedule. It enforces fail-fast validation so a bad value is
//! reported before any network or database work starts.
//!
//! ## Usage
//!
//! ### From the environment
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::from_env().expect("invalid configuration");
//! ```
//!
//! ### With the builder
//!
//! ```
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .client_id("1000.CLIENT")
//!     .client_secret("secret")
//!     .refresh_token("1000.refresh")
//!     .database_path("/var/lib/mirror/zoho_mirror.db")
//!     .records_per_page(100)
//!     .build()
//!     .expect("Failed to build config");
//!
//! assert_eq!(config.base_url(), "https://www.zohoapis.in/bigin/v2");
//! ```
//!
//! ## Error Handling
//!
//! Missing credentials produce an actionable message naming the variable:
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .client_id("1000.CLIENT")
//!     .build()
//!     .expect("Should fail - missing client secret");
//! ```

use crate::error::{Error, Result};
use chrono::Weekday;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_DOMAIN: &str = "www.zohoapis.in";
pub const DEFAULT_ACCOUNTS_DOMAIN: &str = "accounts.zoho.in";
pub const DEFAULT_DATABASE_PATH: &str = "zoho_mirror.db";
pub const DEFAULT_RECORDS_PER_PAGE: u32 = 200;
pub const MAX_RECORDS_PER_PAGE: u32 = 200;
pub const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_millis(500);
pub const MAX_RATE_LIMIT_DELAY: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// IST
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_ERROR_COOLDOWN: Duration = Duration::from_secs(300);
pub const DEFAULT_INTERVAL_HOURS: u64 = 168;

/// OAuth client credentials for the vendor token endpoint.
///
/// `Debug` never prints the secret or either token.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Optional initial access token; refreshed on demand when absent
    pub access_token: Option<String>,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// When the scheduler fires a full sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Once a week at a local wall-clock time
    Weekly {
        weekday: Weekday,
        hour: u32,
        minute: u32,
    },
    /// Fixed period measured from the last successful scheduled run
    Every(Duration),
}

impl Default for Cadence {
    fn default() -> Self {
        Cadence::Weekly {
            weekday: Weekday::Sat,
            hour: 10,
            minute: 0,
        }
    }
}

/// Scheduler settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub cadence: Cadence,
    /// Offset of the local zone the weekly cadence is evaluated in
    pub utc_offset_minutes: i32,
    /// Sleep between schedule checks
    pub poll_interval: Duration,
    /// Pause after a failed or panicked trigger
    pub error_cooldown: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cadence: Cadence::default(),
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            poll_interval: DEFAULT_POLL_INTERVAL,
            error_cooldown: DEFAULT_ERROR_COOLDOWN,
        }
    }
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<()> {
        match self.cadence {
            Cadence::Weekly { hour, minute, .. } => {
                if hour > 23 {
                    return Err(Error::Config(format!(
                        "SYNC_HOUR must be between 0 and 23, got {}",
                        hour
                    )));
                }
                if minute > 59 {
                    return Err(Error::Config(format!(
                        "SYNC_MINUTE must be between 0 and 59, got {}",
                        minute
                    )));
                }
            }
            Cadence::Every(period) => {
                if period.is_zero() {
                    return Err(Error::Config(
                        "SYNC_INTERVAL_HOURS must be greater than 0".to_string(),
                    ));
                }
            }
        }

        // Real-world offsets span UTC-12:00 to UTC+14:00
        if !(-720..=840).contains(&self.utc_offset_minutes) {
            return Err(Error::Config(format!(
                "SYNC_UTC_OFFSET_MINUTES must be between -720 and 840, got {}",
                self.utc_offset_minutes
            )));
        }

        if self.poll_interval.is_zero() {
            return Err(Error::Config(
                "Scheduler poll interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Core configuration for the Zoho Bigin mirror.
///
/// Use [`CoreConfigBuilder`] or [`CoreConfig::from_env`] to construct instances.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    pub credentials: ClientCredentials,

    /// API host, e.g. `www.zohoapis.in`
    pub api_domain: String,

    /// Accounts (token) host, e.g. `accounts.zoho.in`
    pub accounts_domain: String,

    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Page size for list requests
    pub records_per_page: u32,

    /// Pause between successful pages
    pub rate_limit_delay: Duration,

    /// Transport attempts for 5xx/429/network failures
    pub max_retries: u32,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Records written per batch transaction
    pub batch_size: usize,

    /// Whether deletion runs against a fetch that aborted after some pages
    pub prune_on_partial_fetch: bool,

    pub schedule: ScheduleConfig,
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut builder = CoreConfig::builder();

        if let Some(v) = get("ZOHO_CLIENT_ID") {
            builder = builder.client_id(v);
        }
        if let Some(v) = get("ZOHO_CLIENT_SECRET") {
            builder = builder.client_secret(v);
        }
        if let Some(v) = get("ZOHO_REFRESH_TOKEN") {
            builder = builder.refresh_token(v);
        }
        if let Some(v) = get("ZOHO_ACCESS_TOKEN") {
            builder = builder.access_token(v);
        }
        if let Some(v) = get("ZOHO_API_DOMAIN") {
            builder = builder.api_domain(v);
        }
        if let Some(v) = get("ZOHO_ACCOUNTS_DOMAIN") {
            builder = builder.accounts_domain(v);
        }
        if let Some(v) = get("ZOHO_DATABASE_PATH") {
            builder = builder.database_path(v);
        }
        if let Some(v) = get("RECORDS_PER_PAGE") {
            builder = builder.records_per_page(parse_var("RECORDS_PER_PAGE", &v)?);
        }
        if let Some(v) = get("RATE_LIMIT_DELAY") {
            builder = builder.rate_limit_delay(parse_seconds("RATE_LIMIT_DELAY", &v)?);
        }
        if let Some(v) = get("MAX_RETRIES") {
            builder = builder.max_retries(parse_var("MAX_RETRIES", &v)?);
        }
        if let Some(v) = get("REQUEST_TIMEOUT") {
            builder = builder.request_timeout(parse_seconds("REQUEST_TIMEOUT", &v)?);
        }
        if let Some(v) = get("SYNC_BATCH_SIZE") {
            builder = builder.batch_size(parse_var("SYNC_BATCH_SIZE", &v)?);
        }
        if let Some(v) = get("PRUNE_ON_PARTIAL_FETCH") {
            builder = builder.prune_on_partial_fetch(parse_flag("PRUNE_ON_PARTIAL_FETCH", &v)?);
        }

        let mut schedule = ScheduleConfig::default();
        if let Some(v) = get("SYNC_UTC_OFFSET_MINUTES") {
            schedule.utc_offset_minutes = parse_var("SYNC_UTC_OFFSET_MINUTES", &v)?;
        }

        let cadence = get("SYNC_CADENCE").unwrap_or_else(|| "weekly".to_string());
        schedule.cadence = match cadence.to_lowercase().as_str() {
            "weekly" => {
                let weekday = match get("SYNC_WEEKDAY") {
                    Some(v) => Weekday::from_str(&v).map_err(|_| {
                        Error::Config(format!(
                            "SYNC_WEEKDAY must be a weekday name such as 'sat', got '{}'",
                            v
                        ))
                    })?,
                    None => Weekday::Sat,
                };
                let hour = match get("SYNC_HOUR") {
                    Some(v) => parse_var("SYNC_HOUR", &v)?,
                    None => 10,
                };
                let minute = match get("SYNC_MINUTE") {
                    Some(v) => parse_var("SYNC_MINUTE", &v)?,
                    None => 0,
                };
                Cadence::Weekly {
                    weekday,
                    hour,
                    minute,
                }
            }
            "interval" => {
                let hours: u64 = match get("SYNC_INTERVAL_HOURS") {
                    Some(v) => parse_var("SYNC_INTERVAL_HOURS", &v)?,
                    None => DEFAULT_INTERVAL_HOURS,
                };
                Cadence::Every(Duration::from_secs(hours.saturating_mul(3600)))
            }
            other => {
                return Err(Error::Config(format!(
                    "SYNC_CADENCE must be 'weekly' or 'interval', got '{}'",
                    other
                )))
            }
        };

        builder.schedule(schedule).build()
    }

    /// OAuth token endpoint
    pub fn token_url(&self) -> String {
        format!("https://{}/oauth/v2/token", self.accounts_domain)
    }

    /// Base of every Bigin v2 API path
    pub fn base_url(&self) -> String {
        format!("https://{}/bigin/v2", self.api_domain)
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("ZOHO_CLIENT_ID", &self.credentials.client_id),
            ("ZOHO_CLIENT_SECRET", &self.credentials.client_secret),
            ("ZOHO_REFRESH_TOKEN", &self.credentials.refresh_token),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{} cannot be empty", name)));
            }
        }

        validate_host("ZOHO_API_DOMAIN", &self.api_domain)?;
        validate_host("ZOHO_ACCOUNTS_DOMAIN", &self.accounts_domain)?;

        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if !(1..=MAX_RECORDS_PER_PAGE).contains(&self.records_per_page) {
            return Err(Error::Config(format!(
                "RECORDS_PER_PAGE must be between 1 and {}, got {}",
                MAX_RECORDS_PER_PAGE, self.records_per_page
            )));
        }

        if self.rate_limit_delay > MAX_RATE_LIMIT_DELAY {
            return Err(Error::Config(
                "RATE_LIMIT_DELAY exceeds maximum of 60 seconds".to_string(),
            ));
        }

        if !(1..=10).contains(&self.max_retries) {
            return Err(Error::Config(format!(
                "MAX_RETRIES must be between 1 and 10, got {}",
                self.max_retries
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "REQUEST_TIMEOUT must be greater than 0 seconds".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(Error::Config(
                "SYNC_BATCH_SIZE must be greater than 0".to_string(),
            ));
        }

        self.schedule.validate()
    }
}

fn validate_host(name: &str, host: &str) -> Result<()> {
    if host.trim().is_empty() {
        return Err(Error::Config(format!("{} cannot be empty", name)));
    }
    if host.contains("://") || host.contains('/') {
        return Err(Error::Config(format!(
            "{} must be a bare host name such as '{}', got '{}'",
            name,
            if name == "ZOHO_API_DOMAIN" {
                DEFAULT_API_DOMAIN
            } else {
                DEFAULT_ACCOUNTS_DOMAIN
            },
            host
        )));
    }
    Ok(())
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| Error::Config(format!("Invalid value for {}: '{}'", name, value)))
}

/// Non-negative, finite seconds; fractions allowed.
fn parse_seconds(name: &str, value: &str) -> Result<Duration> {
    let secs: f64 = parse_var(name, value)?;
    // Upper bound keeps from_secs_f64 well clear of overflow
    if !secs.is_finite() || secs < 0.0 || secs > 86_400.0 {
        return Err(Error::Config(format!(
            "{} must be a number of seconds between 0 and 86400, got '{}'",
            name, value
        )));
    }
    Ok(Duration::from_secs_f64(secs))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!(
            "{} must be true or false, got '{}'",
            name, value
        ))),
    }
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Every setting except the three OAuth credentials has a default.
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
    access_token: Option<String>,
    api_domain: Option<String>,
    accounts_domain: Option<String>,
    database_path: Option<PathBuf>,
    records_per_page: Option<u32>,
    rate_limit_delay: Option<Duration>,
    max_retries: Option<u32>,
    request_timeout: Option<Duration>,
    batch_size: Option<usize>,
    prune_on_partial_fetch: Option<bool>,
    schedule: Option<ScheduleConfig>,
}

impl CoreConfigBuilder {
    pub fn client_id(mut self, value: impl Into<String>) -> Self {
        self.client_id = Some(value.into());
        self
    }

    pub fn client_secret(mut self, value: impl Into<String>) -> Self {
        self.client_secret = Some(value.into());
        self
    }

    pub fn refresh_token(mut self, value: impl Into<String>) -> Self {
        self.refresh_token = Some(value.into());
        self
    }

    /// Seed an access token so the first request skips the refresh.
    pub fn access_token(mut self, value: impl Into<String>) -> Self {
        self.access_token = Some(value.into());
        self
    }

    /// Sets the API host.
    ///
    /// Default: `www.zohoapis.in`
    pub fn api_domain(mut self, value: impl Into<String>) -> Self {
        self.api_domain = Some(value.into());
        self
    }

    /// Sets the accounts host used for token refresh.
    ///
    /// Default: `accounts.zoho.in`
    pub fn accounts_domain(mut self, value: impl Into<String>) -> Self {
        self.accounts_domain = Some(value.into());
        self
    }

    /// Sets the database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .database_path("/path/to/zoho_mirror.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Default: 200 (the vendor maximum)
    pub fn records_per_page(mut self, value: u32) -> Self {
        self.records_per_page = Some(value);
        self
    }

    /// Default: 500 ms
    pub fn rate_limit_delay(mut self, value: Duration) -> Self {
        self.rate_limit_delay = Some(value);
        self
    }

    /// Default: 3
    pub fn max_retries(mut self, value: u32) -> Self {
        self.max_retries = Some(value);
        self
    }

    /// Default: 30 s
    pub fn request_timeout(mut self, value: Duration) -> Self {
        self.request_timeout = Some(value);
        self
    }

    /// Default: 100
    pub fn batch_size(mut self, value: usize) -> Self {
        self.batch_size = Some(value);
        self
    }

    /// Default: true
    pub fn prune_on_partial_fetch(mut self, value: bool) -> Self {
        self.prune_on_partial_fetch = Some(value);
        self
    }

    pub fn schedule(mut self, value: ScheduleConfig) -> Self {
        self.schedule = Some(value);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns an error if a credential is missing or a value is out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let client_id = self.client_id.ok_or_else(|| {
            Error::Config(
                "Client id is required. Set ZOHO_CLIENT_ID or use .client_id().".to_string(),
            )
        })?;
        let client_secret = self.client_secret.ok_or_else(|| {
            Error::Config(
                "Client secret is required. Set ZOHO_CLIENT_SECRET or use .client_secret()."
                    .to_string(),
            )
        })?;
        let refresh_token = self.refresh_token.ok_or_else(|| {
            Error::Config(
                "Refresh token is required. Set ZOHO_REFRESH_TOKEN or use .refresh_token()."
                    .to_string(),
            )
        })?;

        let config = CoreConfig {
            credentials: ClientCredentials {
                client_id,
                client_secret,
                refresh_token,
                access_token: self.access_token,
            },
            api_domain: self
                .api_domain
                .unwrap_or_else(|| DEFAULT_API_DOMAIN.to_string()),
            accounts_domain: self
                .accounts_domain
                .unwrap_or_else(|| DEFAULT_ACCOUNTS_DOMAIN.to_string()),
            database_path: self
                .database_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            records_per_page: self.records_per_page.unwrap_or(DEFAULT_RECORDS_PER_PAGE),
            rate_limit_delay: self.rate_limit_delay.unwrap_or(DEFAULT_RATE_LIMIT_DELAY),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            prune_on_partial_fetch: self.prune_on_partial_fetch.unwrap_or(true),
            schedule: self.schedule.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .client_id("1000.CLIENT")
            .client_secret("secret")
            .refresh_token("1000.refresh")
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("ZOHO_CLIENT_ID", "1000.CLIENT"),
        ("ZOHO_CLIENT_SECRET", "secret"),
        ("ZOHO_REFRESH_TOKEN", "1000.refresh"),
    ];

    #[test]
    fn test_builder_defaults() {
        let config = base_builder().build().unwrap();

        assert_eq!(config.api_domain, "www.zohoapis.in");
        assert_eq!(config.accounts_domain, "accounts.zoho.in");
        assert_eq!(config.database_path, PathBuf::from("zoho_mirror.db"));
        assert_eq!(config.records_per_page, 200);
        assert_eq!(config.rate_limit_delay, Duration::from_millis(500));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.batch_size, 100);
        assert!(config.prune_on_partial_fetch);
        assert_eq!(config.schedule, ScheduleConfig::default());
        assert!(config.credentials.access_token.is_none());
    }

    #[test]
    fn test_derived_urls() {
        let config = base_builder()
            .api_domain("www.zohoapis.com")
            .accounts_domain("accounts.zoho.com")
            .build()
            .unwrap();

        assert_eq!(config.base_url(), "https://www.zohoapis.com/bigin/v2");
        assert_eq!(
            config.token_url(),
            "https://accounts.zoho.com/oauth/v2/token"
        );
    }

    #[test]
    fn test_builder_requires_credentials() {
        let err = CoreConfig::builder()
            .client_id("1000.CLIENT")
            .client_secret("secret")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("ZOHO_REFRESH_TOKEN"));

        let err = CoreConfig::builder().build().unwrap_err();
        assert!(err.to_string().contains("ZOHO_CLIENT_ID"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let err = base_builder().records_per_page(0).build().unwrap_err();
        assert!(err.to_string().contains("RECORDS_PER_PAGE"));

        let err = base_builder().records_per_page(201).build().unwrap_err();
        assert!(err.to_string().contains("RECORDS_PER_PAGE"));

        let err = base_builder()
            .rate_limit_delay(Duration::from_secs(61))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("RATE_LIMIT_DELAY"));

        let err = base_builder().max_retries(11).build().unwrap_err();
        assert!(err.to_string().contains("MAX_RETRIES"));

        let err = base_builder().batch_size(0).build().unwrap_err();
        assert!(err.to_string().contains("SYNC_BATCH_SIZE"));
    }

    #[test]
    fn test_validate_rejects_url_as_domain() {
        let err = base_builder()
            .api_domain("https://www.zohoapis.in")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("bare host name"));
    }

    #[test]
    fn test_schedule_validation() {
        let schedule = ScheduleConfig {
            cadence: Cadence::Weekly {
                weekday: Weekday::Mon,
                hour: 24,
                minute: 0,
            },
            ..ScheduleConfig::default()
        };
        let err = base_builder().schedule(schedule).build().unwrap_err();
        assert!(err.to_string().contains("SYNC_HOUR"));

        let schedule = ScheduleConfig {
            cadence: Cadence::Every(Duration::ZERO),
            ..ScheduleConfig::default()
        };
        assert!(base_builder().schedule(schedule).build().is_err());
    }

    #[test]
    fn test_from_lookup_with_required_only() {
        let config = CoreConfig::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert_eq!(config.credentials.client_id, "1000.CLIENT");
        assert_eq!(config.records_per_page, 200);
        assert_eq!(
            config.schedule.cadence,
            Cadence::Weekly {
                weekday: Weekday::Sat,
                hour: 10,
                minute: 0
            }
        );
    }

    #[test]
    fn test_from_lookup_missing_secret() {
        let err = CoreConfig::from_lookup(lookup_from(&[("ZOHO_CLIENT_ID", "x")])).unwrap_err();
        assert!(err.to_string().contains("ZOHO_CLIENT_SECRET"));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("ZOHO_ACCESS_TOKEN", "1000.access"),
            ("ZOHO_API_DOMAIN", "www.zohoapis.com"),
            ("ZOHO_DATABASE_PATH", "/tmp/mirror.db"),
            ("RECORDS_PER_PAGE", "50"),
            ("RATE_LIMIT_DELAY", "1.5"),
            ("MAX_RETRIES", "5"),
            ("REQUEST_TIMEOUT", "10"),
            ("SYNC_BATCH_SIZE", "25"),
            ("PRUNE_ON_PARTIAL_FETCH", "false"),
            ("SYNC_WEEKDAY", "Monday"),
            ("SYNC_HOUR", "6"),
            ("SYNC_MINUTE", "45"),
            ("SYNC_UTC_OFFSET_MINUTES", "-300"),
        ]);

        let config = CoreConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.credentials.access_token.as_deref(), Some("1000.access"));
        assert_eq!(config.api_domain, "www.zohoapis.com");
        assert_eq!(config.database_path, PathBuf::from("/tmp/mirror.db"));
        assert_eq!(config.records_per_page, 50);
        assert_eq!(config.rate_limit_delay, Duration::from_millis(1500));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.batch_size, 25);
        assert!(!config.prune_on_partial_fetch);
        assert_eq!(config.schedule.utc_offset_minutes, -300);
        assert_eq!(
            config.schedule.cadence,
            Cadence::Weekly {
                weekday: Weekday::Mon,
                hour: 6,
                minute: 45
            }
        );
    }

    #[test]
    fn test_from_lookup_interval_cadence() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([("SYNC_CADENCE", "interval"), ("SYNC_INTERVAL_HOURS", "24")]);

        let config = CoreConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(
            config.schedule.cadence,
            Cadence::Every(Duration::from_secs(24 * 3600))
        );
    }

    #[test]
    fn test_from_lookup_rejects_bad_numbers() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("RECORDS_PER_PAGE", "lots"));
        let err = CoreConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("RECORDS_PER_PAGE"));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("RATE_LIMIT_DELAY", "-1"));
        assert!(CoreConfig::from_lookup(lookup_from(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SYNC_CADENCE", "hourly"));
        let err = CoreConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("SYNC_CADENCE"));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([("ZOHO_ACCESS_TOKEN", ""), ("RECORDS_PER_PAGE", "  ")]);

        let config = CoreConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(config.credentials.access_token.is_none());
        assert_eq!(config.records_per_page, 200);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = base_builder().access_token("1000.access").build().unwrap();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("1000.CLIENT"));
        assert!(!rendered.contains("secret\""));
        assert!(!rendered.contains("1000.refresh"));
        assert!(!rendered.contains("1000.access"));
    }
}
