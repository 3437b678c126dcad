//! Domain models for the mirror store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

// =============================================================================
// Module
// =============================================================================

/// A Bigin CRM module mirrored into its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Module {
    Contacts,
    Accounts,
    Pipelines,
    Calls,
    Events,
    Tasks,
    Notes,
}

impl Module {
    /// Every module in sync order
    pub const ALL: [Module; 7] = [
        Module::Contacts,
        Module::Accounts,
        Module::Pipelines,
        Module::Calls,
        Module::Events,
        Module::Tasks,
        Module::Notes,
    ];

    /// Module name as used in API paths
    pub fn api_name(&self) -> &'static str {
        match self {
            Module::Contacts => "Contacts",
            Module::Accounts => "Accounts",
            Module::Pipelines => "Pipelines",
            Module::Calls => "Calls",
            Module::Events => "Events",
            Module::Tasks => "Tasks",
            Module::Notes => "Notes",
        }
    }

    /// Local table holding this module's rows
    pub fn table(&self) -> &'static str {
        match self {
            Module::Contacts => "contacts",
            Module::Accounts => "accounts",
            Module::Pipelines => "pipelines",
            Module::Calls => "calls",
            Module::Events => "events",
            Module::Tasks => "tasks",
            Module::Notes => "notes",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

impl FromStr for Module {
    type Err = StoreError;

    /// Accepts the API name or the table name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Module::ALL
            .iter()
            .copied()
            .find(|m| m.api_name().eq_ignore_ascii_case(wanted) || m.table() == wanted)
            .ok_or_else(|| StoreError::InvalidInput {
                field: "module".to_string(),
                message: format!("Unknown module: {}", s),
            })
    }
}

// =============================================================================
// Column values
// =============================================================================

/// A typed, nullable value for one mapped column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(Option<String>),
    Integer(Option<i64>),
    Real(Option<f64>),
    Boolean(Option<bool>),
    Date(Option<NaiveDate>),
    DateTime(Option<DateTime<Utc>>),
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        match self {
            ColumnValue::Text(v) => v.is_none(),
            ColumnValue::Integer(v) => v.is_none(),
            ColumnValue::Real(v) => v.is_none(),
            ColumnValue::Boolean(v) => v.is_none(),
            ColumnValue::Date(v) => v.is_none(),
            ColumnValue::DateTime(v) => v.is_none(),
        }
    }

    /// Text payload, if this is a non-null text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(v) => v.as_deref(),
            _ => None,
        }
    }
}

// =============================================================================
// Entity records
// =============================================================================

/// A fully mapped row ready to be written.
///
/// `fields` holds the module-specific columns in table order; the shared
/// columns are carried separately.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub zoho_id: String,
    pub created_time: Option<DateTime<Utc>>,
    pub modified_time: Option<DateTime<Utc>>,
    /// Full vendor payload as JSON text
    pub data: String,
    pub fields: Vec<(&'static str, ColumnValue)>,
}

impl EntityRecord {
    /// Look up a mapped column by name
    pub fn field(&self, column: &str) -> Option<&ColumnValue> {
        self.fields
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    /// Validate before writing.
    ///
    /// Length limits on `zoho_id` are left to the schema.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.zoho_id.trim().is_empty() {
            return Err("zoho_id cannot be empty".to_string());
        }
        if let Some((name, _)) = self.fields.iter().find(|(name, _)| !is_safe_identifier(name)) {
            return Err(format!("invalid column name: {}", name));
        }
        Ok(())
    }
}

/// Column names are interpolated into SQL, so only `[a-z0-9_]` is allowed.
pub(crate) fn is_safe_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// The shared columns of a stored row.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct StoredEntity {
    pub id: i64,
    pub zoho_id: String,
    pub created_time: Option<DateTime<Utc>>,
    pub modified_time: Option<DateTime<Utc>>,
    pub data: Option<String>,
    /// Unix seconds of first insert
    pub created_at: i64,
}
