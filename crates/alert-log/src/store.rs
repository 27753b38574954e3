//! Alert log trait and entry types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use costwatch_source::WorkflowCostRecord;

/// Errors that can occur against the alert log store.
#[derive(Debug, Error)]
pub enum AlertLogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Store returned an error response.
    #[error("store error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A row in the store could not be decoded.
    #[error("malformed row: {0}")]
    MalformedRow(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A write job finished in a failed state.
    #[error("write job failed: {0}")]
    WriteFailed(String),
}

/// Fully qualified `project.dataset.table` identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableId {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableId {
    /// Parse a `project.dataset.table` string.
    ///
    /// # Errors
    ///
    /// Returns an error unless the input has exactly three non-empty
    /// dot-separated parts.
    pub fn parse(raw: &str) -> Result<Self, AlertLogError> {
        let parts: Vec<&str> = raw.split('.').collect();
        match parts.as_slice() {
            [project, dataset, table]
                if !project.is_empty() && !dataset.is_empty() && !table.is_empty() =>
            {
                Ok(Self {
                    project: (*project).to_string(),
                    dataset: (*dataset).to_string(),
                    table: (*table).to_string(),
                })
            }
            _ => Err(AlertLogError::Config(format!(
                "table id must be project.dataset.table, got '{raw}'"
            ))),
        }
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// One previously-emitted alert.
///
/// Structurally a [`WorkflowCostRecord`] plus the timestamp it was written
/// to the store. Entries are never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertLogEntry {
    #[serde(flatten)]
    pub record: WorkflowCostRecord,
    pub logged_at: DateTime<Utc>,
}

impl AlertLogEntry {
    /// Wrap a record with its persistence timestamp.
    #[must_use]
    pub fn new(record: WorkflowCostRecord, logged_at: DateTime<Utc>) -> Self {
        Self { record, logged_at }
    }
}

/// Queryable, rewriteable alert log.
///
/// Retention lives at read time: `recent_entries` only returns entries
/// whose submit time falls inside the monitoring window, and each
/// `replace` drops whatever the preceding read no longer returned.
#[async_trait]
pub trait AlertLogStore: Send + Sync {
    /// Entries whose `submit_time` is within the last `window_hours`.
    ///
    /// A store that has never been written to (table absent) returns an
    /// empty collection.
    ///
    /// # Errors
    ///
    /// Any failure other than an absent table is an error; the caller
    /// treats it as fatal for the run.
    async fn recent_entries(&self, window_hours: f64)
        -> Result<Vec<AlertLogEntry>, AlertLogError>;

    /// Rewrite the log to exactly `entries`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write does not complete; a lost write would
    /// re-alert every entry on the next run.
    async fn replace(&self, entries: &[AlertLogEntry]) -> Result<(), AlertLogError>;
}
