//! Workflow platform REST API client.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::debug;
use urlencoding::encode;

use crate::models::{
    ApiError, SubmissionDetail, SubmissionSummary, WorkflowMetadata, WorkspaceListEntry,
    WorkspaceRef,
};

/// Production API base URL.
const DEFAULT_API_BASE: &str = "https://api.firecloud.org/api";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur talking to the workflow platform.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Authentication error (missing or empty token).
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Response body did not deserialize.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Client for the workflow platform REST API.
#[derive(Debug, Clone)]
pub struct WorkbenchClient {
    client: Client,
    base_url: String,
    token: String,
}

impl WorkbenchClient {
    /// Create a client against the production API.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the HTTP client cannot be
    /// built.
    pub fn new(token: impl Into<String>) -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_API_BASE, token)
    }

    /// Create a client against a specific API base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the HTTP client cannot be
    /// built.
    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, SourceError> {
        let token = token.into();
        if token.is_empty() {
            return Err(SourceError::Auth(
                "workflow platform API token is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(SourceError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Make an authenticated GET request.
    async fn get<T>(&self, path: &str) -> Result<T, SourceError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "Platform API request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if let Ok(error) = serde_json::from_str::<ApiError>(&error_text) {
                return Err(SourceError::Api {
                    status: status.as_u16(),
                    message: error.message,
                });
            }
            return Err(SourceError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(SourceError::Serialization)
    }

    /// List every workspace visible to the caller.
    ///
    /// Field selection keeps the payload to workspace identity only; the
    /// caller filters by namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    pub async fn list_workspaces(&self) -> Result<Vec<WorkspaceRef>, SourceError> {
        let entries: Vec<WorkspaceListEntry> = self
            .get("/workspaces?fields=workspace.name,workspace.namespace")
            .await?;
        Ok(entries.into_iter().map(|e| e.workspace).collect())
    }

    /// List all submissions in a workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    pub async fn list_submissions(
        &self,
        namespace: &str,
        workspace: &str,
    ) -> Result<Vec<SubmissionSummary>, SourceError> {
        self.get(&format!(
            "/workspaces/{}/{}/submissions",
            encode(namespace),
            encode(workspace)
        ))
        .await
    }

    /// Fetch one submission with its workflows and their current cost.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    pub async fn get_submission(
        &self,
        namespace: &str,
        workspace: &str,
        submission_id: &str,
    ) -> Result<SubmissionDetail, SourceError> {
        self.get(&format!(
            "/workspaces/{}/{}/submissions/{}",
            encode(namespace),
            encode(workspace),
            encode(submission_id)
        ))
        .await
    }

    /// Fetch lifecycle timestamps for one workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    pub async fn get_workflow_metadata(
        &self,
        namespace: &str,
        workspace: &str,
        submission_id: &str,
        workflow_id: &str,
    ) -> Result<WorkflowMetadata, SourceError> {
        self.get(&format!(
            "/workspaces/{}/{}/submissions/{}/workflows/{}",
            encode(namespace),
            encode(workspace),
            encode(submission_id),
            encode(workflow_id)
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_new_client_requires_token() {
        let result = WorkbenchClient::new("");
        assert!(matches!(result, Err(SourceError::Auth(_))));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = WorkbenchClient::with_base_url("https://example.org/api/", "token").unwrap();
        assert_eq!(client.base_url, "https://example.org/api");
    }

    #[tokio::test]
    async fn test_list_workspaces() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/workspaces"))
            .and(bearer_token("secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"workspace": {"namespace": "billing-ns", "name": "alpha"}},
                {"workspace": {"namespace": "other-ns", "name": "beta"}},
            ])))
            .mount(&server)
            .await;

        let client = WorkbenchClient::with_base_url(server.uri(), "secret").unwrap();
        let workspaces = client.list_workspaces().await.unwrap();

        assert_eq!(workspaces.len(), 2);
        assert_eq!(workspaces[0].namespace, "billing-ns");
        assert_eq!(workspaces[0].name, "alpha");
    }

    #[tokio::test]
    async fn test_error_envelope_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/workspaces/ns/ws/submissions"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({"message": "insufficient permissions"})),
            )
            .mount(&server)
            .await;

        let client = WorkbenchClient::with_base_url(server.uri(), "secret").unwrap();
        let err = client.list_submissions("ns", "ws").await.unwrap_err();

        match err {
            SourceError::Api { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "insufficient permissions");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_workspace_names_are_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/workspaces/ns/my%20workspace/submissions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = WorkbenchClient::with_base_url(server.uri(), "secret").unwrap();
        let submissions = client.list_submissions("ns", "my workspace").await.unwrap();
        assert!(submissions.is_empty());
    }

    #[tokio::test]
    async fn test_get_submission_without_workflows_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/workspaces/ns/ws/submissions/sub-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Done"})))
            .mount(&server)
            .await;

        let client = WorkbenchClient::with_base_url(server.uri(), "secret").unwrap();
        let detail = client.get_submission("ns", "ws", "sub-1").await.unwrap();
        assert!(detail.workflows.is_empty());
    }
}
