//! Platform API response models.

use serde::Deserialize;

use crate::types::WorkflowStatus;

// ============================================================================
// Workspace listing
// ============================================================================

/// One entry from the workspace listing endpoint.
///
/// The listing is requested with field selection, so only the nested
/// `workspace` object is present.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceListEntry {
    pub workspace: WorkspaceRef,
}

/// Identity of a workspace within a namespace.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRef {
    pub namespace: String,
    pub name: String,
}

// ============================================================================
// Submissions
// ============================================================================

/// Summary row from the submission listing endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub submission_id: String,
    pub submitter: String,
    pub method_configuration_name: String,
    /// Raw submission timestamp; absent when the platform has not stamped it.
    pub submission_date: Option<String>,
}

/// Detail view of one submission.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionDetail {
    /// Workflows spawned by this submission; absent for submissions the
    /// executor has not expanded yet.
    #[serde(default)]
    pub workflows: Vec<WorkflowEntry>,
}

/// One workflow row inside a submission detail.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEntry {
    /// Absent until the executor assigns an id to the workflow.
    pub workflow_id: Option<String>,
    /// Absent until the platform has priced the workflow.
    pub cost: Option<f64>,
    pub status: WorkflowStatus,
}

// ============================================================================
// Workflow metadata
// ============================================================================

/// Lifecycle timestamps from the per-workflow metadata endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowMetadata {
    pub start: Option<String>,
    pub end: Option<String>,
}

// ============================================================================
// Error response
// ============================================================================

/// Error envelope returned by the platform on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub message: String,
}
