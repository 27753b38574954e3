//! BigQuery-backed alert log store.
//!
//! Reads go through `jobs.query` with a named timestamp parameter; writes
//! go through a multipart media-upload load job with `WRITE_TRUNCATE`, then
//! poll the job until it completes.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use costwatch_source::{WorkflowCostRecord, WorkflowStatus};

use crate::store::{AlertLogEntry, AlertLogError, AlertLogStore, TableId};

/// Production Google API host.
const DEFAULT_API_HOST: &str = "https://bigquery.googleapis.com";

/// Default timeout for store requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// How long the query call itself may wait for results.
const QUERY_TIMEOUT_MS: u64 = 30_000;

/// Delay between load-job status polls.
const POLL_INTERVAL_SECS: u64 = 2;

/// Maximum load-job status polls before giving up.
const MAX_POLL_ATTEMPTS: u32 = 30;

/// Multipart boundary for media-upload requests.
const UPLOAD_BOUNDARY: &str = "costwatch_load_boundary";

/// Alert log persisted in a BigQuery table.
#[derive(Debug, Clone)]
pub struct BigQueryStore {
    client: Client,
    host: String,
    table: TableId,
    token: String,
}

impl BigQueryStore {
    /// Create a store against the production BigQuery API.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the HTTP client cannot be
    /// built.
    pub fn new(table: TableId, token: impl Into<String>) -> Result<Self, AlertLogError> {
        Self::with_host(DEFAULT_API_HOST, table, token)
    }

    /// Create a store against a specific API host.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the HTTP client cannot be
    /// built.
    pub fn with_host(
        host: impl Into<String>,
        table: TableId,
        token: impl Into<String>,
    ) -> Result<Self, AlertLogError> {
        let token = token.into();
        if token.is_empty() {
            return Err(AlertLogError::Config(
                "BigQuery access token is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(AlertLogError::Http)?;

        Ok(Self {
            client,
            host: host.into().trim_end_matches('/').to_string(),
            table,
            token,
        })
    }

    /// Map a non-success response to an error, decoding the Google error
    /// envelope when present.
    async fn error_from_response(response: reqwest::Response) -> AlertLogError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        if let Ok(envelope) = serde_json::from_str::<GoogleErrorEnvelope>(&body) {
            return AlertLogError::Api {
                status,
                message: envelope.error.message,
            };
        }
        AlertLogError::Api {
            status,
            message: body,
        }
    }

    /// Fetch the current state of a load job.
    async fn fetch_job(&self, job_id: &str, location: Option<&str>) -> Result<Job, AlertLogError> {
        let mut url = format!(
            "{}/bigquery/v2/projects/{}/jobs/{job_id}",
            self.host, self.table.project
        );
        if let Some(location) = location {
            url.push_str(&format!("?location={location}"));
        }

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(AlertLogError::Serialization)
    }

    /// Wait for a load job to finish, surfacing its terminal error if any.
    async fn wait_for_job(&self, job: Job) -> Result<(), AlertLogError> {
        let mut current = job;
        let mut attempts = 0;

        loop {
            if current.status.state == "DONE" {
                if let Some(error) = current.status.error_result {
                    return Err(AlertLogError::WriteFailed(error.message));
                }
                return Ok(());
            }

            attempts += 1;
            if attempts > MAX_POLL_ATTEMPTS {
                return Err(AlertLogError::WriteFailed(format!(
                    "load job {} still {} after {MAX_POLL_ATTEMPTS} polls",
                    current.job_reference.job_id, current.status.state
                )));
            }

            debug!(
                job_id = %current.job_reference.job_id,
                state = %current.status.state,
                "Waiting for load job"
            );
            tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;

            let job_id = current.job_reference.job_id.clone();
            let location = current.job_reference.location.clone();
            current = self.fetch_job(&job_id, location.as_deref()).await?;
        }
    }
}

#[async_trait]
impl AlertLogStore for BigQueryStore {
    async fn recent_entries(
        &self,
        window_hours: f64,
    ) -> Result<Vec<AlertLogEntry>, AlertLogError> {
        let cutoff = Utc::now() - chrono::Duration::milliseconds((window_hours * 3_600_000.0) as i64);
        let sql = format!(
            "SELECT namespace, workspace, submission_id, workflow_id, submission_name, \
             submitter, cost, submit_time, start_time, end_time, status, logged_at \
             FROM `{}.{}` WHERE submit_time >= @cutoff",
            self.table.dataset, self.table.table
        );

        let url = format!(
            "{}/bigquery/v2/projects/{}/queries",
            self.host, self.table.project
        );
        debug!(table = %self.table, cutoff = %cutoff, "Querying alert log");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({
                "query": sql,
                "useLegacySql": false,
                "timeoutMs": QUERY_TIMEOUT_MS,
                "parameterMode": "NAMED",
                "queryParameters": [{
                    "name": "cutoff",
                    "parameterType": {"type": "TIMESTAMP"},
                    "parameterValue": {"value": cutoff.to_rfc3339()},
                }],
            }))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 404 {
            // First run ever: the table does not exist yet.
            info!(table = %self.table, "Alert log table absent, treating as empty");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let body = response.text().await?;
        let query: QueryResponse =
            serde_json::from_str(&body).map_err(AlertLogError::Serialization)?;

        if !query.job_complete {
            return Err(AlertLogError::Api {
                status: status.as_u16(),
                message: "query did not complete within the request deadline".to_string(),
            });
        }

        let Some(schema) = query.schema else {
            return Ok(Vec::new());
        };
        let names: Vec<&str> = schema.fields.iter().map(|f| f.name.as_str()).collect();

        query
            .rows
            .unwrap_or_default()
            .iter()
            .map(|row| decode_row(&names, row))
            .collect()
    }

    async fn replace(&self, entries: &[AlertLogEntry]) -> Result<(), AlertLogError> {
        if entries.is_empty() {
            debug!(table = %self.table, "No entries to write");
            return Ok(());
        }

        let mut ndjson = String::new();
        for entry in entries {
            ndjson.push_str(&serde_json::to_string(entry)?);
            ndjson.push('\n');
        }

        let metadata = json!({
            "configuration": {
                "load": {
                    "destinationTable": {
                        "projectId": self.table.project,
                        "datasetId": self.table.dataset,
                        "tableId": self.table.table,
                    },
                    "writeDisposition": "WRITE_TRUNCATE",
                    "sourceFormat": "NEWLINE_DELIMITED_JSON",
                    "schema": {"fields": table_schema()},
                }
            }
        });

        let body = format!(
            "--{UPLOAD_BOUNDARY}\r\n\
             Content-Type: application/json; charset=UTF-8\r\n\r\n\
             {metadata}\r\n\
             --{UPLOAD_BOUNDARY}\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             {ndjson}\r\n\
             --{UPLOAD_BOUNDARY}--"
        );

        let url = format!(
            "{}/upload/bigquery/v2/projects/{}/jobs?uploadType=multipart",
            self.host, self.table.project
        );
        info!(table = %self.table, entries = entries.len(), "Rewriting alert log");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header(
                "Content-Type",
                format!("multipart/related; boundary={UPLOAD_BOUNDARY}"),
            )
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let body = response.text().await?;
        let job: Job = serde_json::from_str(&body).map_err(AlertLogError::Serialization)?;
        self.wait_for_job(job).await
    }
}

/// Column schema for the alert log table.
fn table_schema() -> serde_json::Value {
    json!([
        {"name": "namespace", "type": "STRING", "mode": "REQUIRED"},
        {"name": "workspace", "type": "STRING", "mode": "REQUIRED"},
        {"name": "submission_id", "type": "STRING", "mode": "REQUIRED"},
        {"name": "workflow_id", "type": "STRING", "mode": "REQUIRED"},
        {"name": "submission_name", "type": "STRING", "mode": "REQUIRED"},
        {"name": "submitter", "type": "STRING", "mode": "REQUIRED"},
        {"name": "cost", "type": "FLOAT", "mode": "REQUIRED"},
        {"name": "submit_time", "type": "TIMESTAMP", "mode": "NULLABLE"},
        {"name": "start_time", "type": "TIMESTAMP", "mode": "NULLABLE"},
        {"name": "end_time", "type": "TIMESTAMP", "mode": "NULLABLE"},
        {"name": "status", "type": "STRING", "mode": "REQUIRED"},
        {"name": "logged_at", "type": "TIMESTAMP", "mode": "REQUIRED"},
    ])
}

/// Decode one `f`/`v`-encoded result row into an entry.
fn decode_row(names: &[&str], row: &TableRow) -> Result<AlertLogEntry, AlertLogError> {
    if names.len() != row.f.len() {
        return Err(AlertLogError::MalformedRow(format!(
            "expected {} cells, got {}",
            names.len(),
            row.f.len()
        )));
    }

    let mut cells: HashMap<&str, &str> = HashMap::new();
    for (name, cell) in names.iter().zip(&row.f) {
        if let Some(value) = cell.v.as_deref() {
            cells.insert(*name, value);
        }
    }

    let required = |name: &str| -> Result<String, AlertLogError> {
        cells
            .get(name)
            .map(|v| (*v).to_string())
            .ok_or_else(|| AlertLogError::MalformedRow(format!("missing column '{name}'")))
    };

    let cost_raw = required("cost")?;
    let cost: f64 = cost_raw
        .parse()
        .map_err(|_| AlertLogError::MalformedRow(format!("unparseable cost '{cost_raw}'")))?;

    let record = WorkflowCostRecord {
        namespace: required("namespace")?,
        workspace: required("workspace")?,
        submission_id: required("submission_id")?,
        workflow_id: required("workflow_id")?,
        submission_name: required("submission_name")?,
        submitter: required("submitter")?,
        cost,
        submit_time: timestamp_cell(cells.get("submit_time").copied()),
        start_time: timestamp_cell(cells.get("start_time").copied()),
        end_time: timestamp_cell(cells.get("end_time").copied()),
        status: WorkflowStatus::from(required("status")?),
    };

    let logged_at_raw = required("logged_at")?;
    let logged_at = timestamp_cell(Some(logged_at_raw.as_str())).ok_or_else(|| {
        AlertLogError::MalformedRow(format!("unparseable logged_at '{logged_at_raw}'"))
    })?;

    Ok(AlertLogEntry::new(record, logged_at))
}

/// Decode a timestamp cell.
///
/// BigQuery serializes TIMESTAMP cells as epoch seconds in decimal or
/// scientific notation (e.g. `1.754475600123456E9`).
fn timestamp_cell(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match raw.parse::<f64>() {
        Ok(seconds) => DateTime::from_timestamp_micros((seconds * 1_000_000.0) as i64),
        Err(_) => {
            warn!(value = raw, "Unparseable timestamp cell");
            None
        }
    }
}

// =============================================================================
// BigQuery API types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    schema: Option<TableSchema>,
    rows: Option<Vec<TableRow>>,
    #[serde(default)]
    job_complete: bool,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    fields: Vec<SchemaField>,
}

#[derive(Debug, Deserialize)]
struct SchemaField {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    v: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Job {
    job_reference: JobReference,
    status: JobStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    state: String,
    error_result: Option<JobError>,
}

#[derive(Debug, Deserialize)]
struct JobError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    message: String,
}
