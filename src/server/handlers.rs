//! Trigger endpoint handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::config::Settings;
use crate::pipeline;
use crate::storage::{self, WarehouseLoader};

use super::AppState;

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// Status payload describing the configured scrape.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "service": "pkkacquire",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok",
        "ports_file": state.settings.ports_file,
        "years": state.settings.years,
        "months": state.settings.months,
    }))
}

/// Per-invocation overrides accepted in the POST body.
#[derive(Debug, Default, Deserialize)]
pub struct RunParams {
    pub year: Option<String>,
    pub months: Option<Vec<String>>,
}

/// Execute the full scrape and upload, returning a run summary. Failures at
/// or above aggregation/upload surface as 500 - they mean total data loss
/// for the run.
pub async fn run_scrape(
    State(state): State<AppState>,
    body: Option<Json<RunParams>>,
) -> impl IntoResponse {
    let mut settings = state.settings.clone();
    if let Some(Json(params)) = body {
        if let Some(year) = params.year {
            settings.years = vec![year];
        }
        if let Some(months) = params.months {
            settings.months = months;
        }
    }

    match execute(settings).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            error!("Scrape run failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn execute(settings: Settings) -> anyhow::Result<serde_json::Value> {
    let report = pipeline::run_sequential(&settings).await?;

    if report.records.is_empty() {
        return Ok(run_summary(&report, &settings, None));
    }

    let loader = WarehouseLoader::new();
    let object = storage::blob_name(&settings.blob_prefix);
    let body = storage::to_ndjson(&report.records)?;
    let uri = loader
        .upload_json(&settings.gcs_bucket, &object, body)
        .await?;
    loader
        .load_into_bigquery(
            &settings.bq_project,
            &settings.bq_dataset,
            &settings.bq_table,
            &uri,
        )
        .await?;

    Ok(run_summary(&report, &settings, Some(uri)))
}

/// Trigger response body. Every count comes from the run report; nothing is
/// re-read from disk.
fn run_summary(
    report: &pipeline::ScrapeReport,
    settings: &Settings,
    output_path: Option<String>,
) -> serde_json::Value {
    json!({
        "status": "ok",
        "rows_uploaded": report.records.len(),
        "ports": report.ports,
        "cells_processed": report.cells_processed,
        "cells_failed": report.cells_failed,
        "months": settings.months,
        "years": settings.years,
        "output_path": output_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_come_from_the_report() {
        let report = pipeline::ScrapeReport {
            records: Vec::new(),
            ports: 3,
            cells_processed: 6,
            cells_failed: 1,
        };
        let settings = Settings::default();

        let summary = run_summary(&report, &settings, None);
        assert_eq!(summary["ports"], 3);
        assert_eq!(summary["cells_processed"], 6);
        assert_eq!(summary["cells_failed"], 1);
        assert_eq!(summary["rows_uploaded"], 0);
        assert!(summary["output_path"].is_null());
    }

    #[test]
    fn summary_carries_the_upload_uri() {
        let report = pipeline::ScrapeReport::default();
        let settings = Settings::default();

        let summary = run_summary(&report, &settings, Some("gs://b/o.json".to_string()));
        assert_eq!(summary["output_path"], "gs://b/o.json");
    }
}
