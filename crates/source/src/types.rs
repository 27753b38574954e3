//! Core record type produced by the billing source.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire format for platform timestamps: strict UTC with microsecond
/// precision and a trailing `Z`, e.g. `2026-08-06T12:34:56.789012Z`.
const API_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Parse a platform timestamp string into a UTC datetime.
///
/// # Errors
///
/// Returns a parse error if the input does not match the platform's
/// timestamp format.
pub fn parse_api_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, API_TIMESTAMP_FORMAT).map(|dt| dt.and_utc())
}

/// Execution state of a workflow, carried through for reporting.
///
/// The monitor never branches on this; it only appears in alert output
/// and the persisted log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkflowStatus {
    Submitted,
    Launching,
    Running,
    Succeeded,
    Failed,
    Aborting,
    Aborted,
    /// Any state the platform reports that we do not recognize.
    Unknown(String),
}

impl WorkflowStatus {
    /// Display name for this status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Submitted => "Submitted",
            Self::Launching => "Launching",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Aborting => "Aborting",
            Self::Aborted => "Aborted",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for WorkflowStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Submitted" => Self::Submitted,
            "Launching" => Self::Launching,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            "Aborting" => Self::Aborting,
            "Aborted" => Self::Aborted,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<WorkflowStatus> for String {
    fn from(status: WorkflowStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One billing-relevant workflow execution.
///
/// Built fresh from the live platform on every run; never persisted except
/// as part of an alert log entry. `cost` is non-negative; a workflow the
/// platform has not priced yet is reported as `0.0`. Timestamps are `None`
/// when the platform has not stamped them (workflow not yet started or
/// finished, or metadata unavailable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowCostRecord {
    pub namespace: String,
    pub workspace: String,
    pub submission_id: String,
    pub workflow_id: String,
    pub submission_name: String,
    pub submitter: String,
    pub cost: f64,
    pub submit_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: WorkflowStatus,
}

impl WorkflowCostRecord {
    /// Hours elapsed since this workflow was submitted, as seen from `now`.
    ///
    /// Returns `None` when the submit time is unknown; the monitor treats
    /// such records as outside every monitoring window.
    #[must_use]
    pub fn age_hours(&self, now: DateTime<Utc>) -> Option<f64> {
        self.submit_time
            .map(|t| (now - t).num_milliseconds() as f64 / 3_600_000.0)
    }
}
