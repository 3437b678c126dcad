//! CRM Record Source Abstraction
//!
//! The reconciler consumes vendor records through [`RecordSource`] so the
//! paging and authentication details stay inside the provider crate.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Why a module fetch stopped before the vendor reported the last page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAbort {
    /// Network failure, timeout, or exhausted transport retries
    Transport(String),
    /// 401 that a token refresh could not recover
    Unauthorized,
    /// Any other non-success status, with a truncated body
    Status { status: u16, body: String },
    /// Page body was not the expected JSON envelope
    Decode(String),
}

impl fmt::Display for FetchAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchAbort::Transport(reason) => write!(f, "transport error: {}", reason),
            FetchAbort::Unauthorized => write!(f, "unauthorized after token refresh"),
            FetchAbort::Status { status, body } => {
                write!(f, "unexpected status {}: {}", status, body)
            }
            FetchAbort::Decode(reason) => write!(f, "invalid response body: {}", reason),
        }
    }
}

/// Result of paging through one module
///
/// A fetch never fails outright: it returns what it accumulated together with
/// the reason it stopped early, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    /// Raw vendor records in fetch order
    pub records: Vec<Value>,
    /// Number of pages successfully decoded
    pub pages_fetched: u32,
    /// Set when the fetch ended before the last page
    pub abort: Option<FetchAbort>,
}

impl FetchOutcome {
    /// A fetch that reached the last page
    pub fn complete(records: Vec<Value>, pages_fetched: u32) -> Self {
        Self {
            records,
            pages_fetched,
            abort: None,
        }
    }

    /// A fetch that stopped early
    pub fn aborted(records: Vec<Value>, pages_fetched: u32, reason: FetchAbort) -> Self {
        Self {
            records,
            pages_fetched,
            abort: Some(reason),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.abort.is_none()
    }

    /// Aborted before a single record was obtained
    pub fn is_empty_failure(&self) -> bool {
        self.abort.is_some() && self.records.is_empty()
    }
}

/// Source of raw CRM records for a module
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch every record of `module` (vendor API name, e.g. `Contacts`)
    async fn fetch_module(&self, module: &str) -> FetchOutcome;
}
