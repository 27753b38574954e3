//! Enumeration of billing-relevant workflows.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::client::WorkbenchClient;
use crate::models::SubmissionSummary;
use crate::types::{parse_api_timestamp, WorkflowCostRecord};

/// Collects every billing-relevant workflow visible in a namespace.
///
/// One failing workspace, submission, or metadata query is logged and
/// skipped; it never blocks the rest of the scan. The output order is
/// unspecified.
pub struct Collector {
    client: WorkbenchClient,
    namespace: String,
    workspace: Option<String>,
}

impl Collector {
    /// Create a collector for one namespace, optionally restricted to a
    /// single workspace.
    #[must_use]
    pub fn new(
        client: WorkbenchClient,
        namespace: impl Into<String>,
        workspace: Option<String>,
    ) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            workspace,
        }
    }

    /// Enumerate all workflow cost records currently visible.
    pub async fn collect(&self) -> Vec<WorkflowCostRecord> {
        let workspaces = self.workspaces_to_scan().await;
        debug!(namespace = %self.namespace, count = workspaces.len(), "Scanning workspaces");

        let mut records = Vec::new();
        for workspace in &workspaces {
            self.collect_workspace(workspace, &mut records).await;
        }

        records
    }

    /// Resolve the workspace list: the configured one, or every workspace
    /// in the namespace.
    async fn workspaces_to_scan(&self) -> Vec<String> {
        if let Some(workspace) = &self.workspace {
            return vec![workspace.clone()];
        }

        match self.client.list_workspaces().await {
            Ok(workspaces) => workspaces
                .into_iter()
                .filter(|w| w.namespace == self.namespace)
                .map(|w| w.name)
                .collect(),
            Err(e) => {
                warn!(namespace = %self.namespace, error = %e, "Failed to list workspaces");
                Vec::new()
            }
        }
    }

    /// Collect every workflow in one workspace.
    async fn collect_workspace(&self, workspace: &str, records: &mut Vec<WorkflowCostRecord>) {
        let submissions = match self.client.list_submissions(&self.namespace, workspace).await {
            Ok(submissions) => submissions,
            Err(e) => {
                warn!(
                    namespace = %self.namespace,
                    workspace = %workspace,
                    error = %e,
                    "Failed to list submissions"
                );
                return;
            }
        };

        for submission in submissions {
            self.collect_submission(workspace, &submission, records)
                .await;
        }
    }

    /// Collect every workflow in one submission.
    async fn collect_submission(
        &self,
        workspace: &str,
        submission: &SubmissionSummary,
        records: &mut Vec<WorkflowCostRecord>,
    ) {
        let detail = match self
            .client
            .get_submission(&self.namespace, workspace, &submission.submission_id)
            .await
        {
            Ok(detail) => detail,
            Err(e) => {
                warn!(
                    workspace = %workspace,
                    submission_id = %submission.submission_id,
                    error = %e,
                    "Failed to fetch submission"
                );
                return;
            }
        };

        let submit_time = submission
            .submission_date
            .as_deref()
            .and_then(|raw| parse_timestamp(raw, "submissionDate"));

        for workflow in detail.workflows {
            let Some(workflow_id) = workflow.workflow_id else {
                debug!(
                    submission_id = %submission.submission_id,
                    "Workflow has no id yet, skipping"
                );
                continue;
            };

            let (start_time, end_time) = self
                .fetch_lifecycle(workspace, &submission.submission_id, &workflow_id)
                .await;

            records.push(WorkflowCostRecord {
                namespace: self.namespace.clone(),
                workspace: workspace.to_string(),
                submission_id: submission.submission_id.clone(),
                workflow_id,
                submission_name: submission.method_configuration_name.clone(),
                submitter: submission.submitter.clone(),
                cost: workflow.cost.unwrap_or(0.0),
                submit_time,
                start_time,
                end_time,
                status: workflow.status,
            });
        }
    }

    /// Fetch start/end timestamps for one workflow; any failure degrades to
    /// unknown timestamps rather than dropping the record.
    async fn fetch_lifecycle(
        &self,
        workspace: &str,
        submission_id: &str,
        workflow_id: &str,
    ) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let metadata = match self
            .client
            .get_workflow_metadata(&self.namespace, workspace, submission_id, workflow_id)
            .await
        {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(
                    workflow_id = %workflow_id,
                    error = %e,
                    "Failed to fetch workflow metadata"
                );
                return (None, None);
            }
        };

        let start = metadata
            .start
            .as_deref()
            .and_then(|raw| parse_timestamp(raw, "start"));
        let end = metadata
            .end
            .as_deref()
            .and_then(|raw| parse_timestamp(raw, "end"));
        (start, end)
    }
}

/// Parse a timestamp, degrading to unknown on malformed input.
fn parse_timestamp(raw: &str, field: &str) -> Option<DateTime<Utc>> {
    match parse_api_timestamp(raw) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(field = field, value = raw, error = %e, "Unparseable timestamp");
            None
        }
    }
}
