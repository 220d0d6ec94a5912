//! Output artifacts: local JSON export, GCS upload, BigQuery load.
//!
//! Upload glue is thin REST over reqwest: a media upload into the bucket,
//! then a load job appending into the destination table with schema
//! autodetection. An upload or load failure is fatal for the run - it means
//! the whole scraped batch is lost - so errors propagate to the caller.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Local;
use serde_json::json;
use tracing::info;

use crate::models::VesselCall;

/// Bearer token env override; the GCE metadata server is used when unset.
const TOKEN_ENV: &str = "GOOGLE_OAUTH_TOKEN";

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Load-job poll attempts, two seconds apart, before giving up.
const MAX_JOB_POLLS: u32 = 150;

/// Where a load job stands after one status poll.
#[derive(Debug, PartialEq)]
enum JobState {
    Running,
    Done,
    Failed(String),
}

fn job_state(status: &serde_json::Value) -> JobState {
    let state = status
        .pointer("/status/state")
        .and_then(|s| s.as_str())
        .unwrap_or("");
    if state != "DONE" {
        return JobState::Running;
    }
    match status
        .pointer("/status/errorResult/message")
        .and_then(|m| m.as_str())
    {
        Some(message) => JobState::Failed(message.to_string()),
        None => JobState::Done,
    }
}

/// Timestamped object name under the configured prefix.
pub fn blob_name(prefix: &str) -> String {
    format!(
        "{}/hasil_scraping_{}.json",
        prefix.trim_end_matches('/'),
        Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Serialize records as newline-delimited JSON, the format the load job
/// declares.
pub fn to_ndjson(records: &[VesselCall]) -> anyhow::Result<String> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

/// Write records to a local pretty-printed JSON array. Empty input writes
/// nothing. A missing `.json` extension is appended; parent directories are
/// created.
pub fn export_json(records: &[VesselCall], path: &Path) -> anyhow::Result<PathBuf> {
    if records.is_empty() {
        info!("No records, nothing written");
        return Ok(path.to_path_buf());
    }

    let mut path = path.to_path_buf();
    let has_json_ext = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if !has_json_ext {
        path.set_extension("json");
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let body = serde_json::to_string_pretty(records)?;
    std::fs::write(&path, body)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(path)
}

/// GCS + BigQuery client over their REST surfaces.
pub struct WarehouseLoader {
    client: reqwest::Client,
}

impl WarehouseLoader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Access token from the environment or the metadata server (the latter
    /// is what the serverless variant runs with).
    async fn access_token(&self) -> anyhow::Result<String> {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            return Ok(token);
        }

        let response: serde_json::Value = self
            .client
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .context("No GOOGLE_OAUTH_TOKEN set and metadata server unreachable")?
            .error_for_status()?
            .json()
            .await?;

        response
            .get("access_token")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .context("Metadata server response had no access_token")
    }

    /// Upload a JSON body into the bucket. Returns the `gs://` URI.
    pub async fn upload_json(
        &self,
        bucket: &str,
        object: &str,
        body: String,
    ) -> anyhow::Result<String> {
        let token = self.access_token().await?;
        let url = format!(
            "https://storage.googleapis.com/upload/storage/v1/b/{}/o",
            bucket
        );

        self.client
            .post(&url)
            .query(&[("uploadType", "media"), ("name", object)])
            .bearer_auth(&token)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .context("GCS upload request failed")?
            .error_for_status()
            .context("GCS upload rejected")?;

        let uri = format!("gs://{}/{}", bucket, object);
        info!("Uploaded to GCS: {}", uri);
        Ok(uri)
    }

    /// Append the uploaded object into the destination table with schema
    /// autodetection, polling the load job until it finishes.
    pub async fn load_into_bigquery(
        &self,
        project: &str,
        dataset: &str,
        table: &str,
        gcs_uri: &str,
    ) -> anyhow::Result<()> {
        let token = self.access_token().await?;
        let url = format!(
            "https://bigquery.googleapis.com/bigquery/v2/projects/{}/jobs",
            project
        );

        let job = json!({
            "configuration": {
                "load": {
                    "sourceUris": [gcs_uri],
                    "destinationTable": {
                        "projectId": project,
                        "datasetId": dataset,
                        "tableId": table,
                    },
                    "sourceFormat": "NEWLINE_DELIMITED_JSON",
                    "autodetect": true,
                    "writeDisposition": "WRITE_APPEND",
                }
            }
        });

        let response: serde_json::Value = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&job)
            .send()
            .await
            .context("BigQuery job insert failed")?
            .error_for_status()
            .context("BigQuery job insert rejected")?
            .json()
            .await?;

        let job_id = response
            .pointer("/jobReference/jobId")
            .and_then(|j| j.as_str())
            .context("BigQuery job insert response had no jobId")?
            .to_string();

        // Poll until the job leaves RUNNING. The token is refreshed on every
        // poll: metadata-server tokens can expire while a large load runs.
        let status_url = format!("{}/{}", url, job_id);
        for _ in 0..MAX_JOB_POLLS {
            tokio::time::sleep(std::time::Duration::from_secs(2)).await;

            let token = self.access_token().await?;
            let status: serde_json::Value = self
                .client
                .get(&status_url)
                .bearer_auth(&token)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            match job_state(&status) {
                JobState::Running => continue,
                JobState::Failed(message) => bail!("BigQuery load job failed: {}", message),
                JobState::Done => {
                    info!("Loaded data to BigQuery: {}.{}.{}", project, dataset, table);
                    return Ok(());
                }
            }
        }
        bail!(
            "BigQuery load job {} still running after {} polls",
            job_id,
            MAX_JOB_POLLS
        )
    }
}

impl Default for WarehouseLoader {
    fn default() -> Self {
        Self::new()
    }
}
