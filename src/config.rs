//! Runtime settings for the harvester.
//!
//! Settings come from a TOML file (every key optional, defaults below),
//! then `PKK_*` environment variables override the file. The HTTP trigger
//! can additionally override year/months per invocation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pkkacquire.toml";

/// All runtime settings, flat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// CSV file with port code and display name columns.
    pub ports_file: PathBuf,
    /// Years to scan, as they appear in listing URLs.
    pub years: Vec<String>,
    /// Months to scan, as they appear in listing URLs.
    pub months: Vec<String>,
    /// Service-routing segment of the listing URL.
    pub source: String,
    /// Service-routing code segment of the listing URL.
    pub source_code: String,
    /// Listing page base URL.
    pub base_url: String,
    /// Detail page URL prefix; the PKK number is appended verbatim.
    pub detail_url: String,
    /// Substring marking domestic-route PKK numbers.
    pub domestic_marker: String,

    /// Destination GCS bucket for the scraped batch.
    pub gcs_bucket: String,
    /// GCP project owning the BigQuery dataset.
    pub bq_project: String,
    /// BigQuery dataset id.
    pub bq_dataset: String,
    /// BigQuery table id (append-only).
    pub bq_table: String,
    /// Object name prefix inside the bucket.
    pub blob_prefix: String,

    /// Worker pool size for the batch variant.
    pub workers: usize,
    /// Fetch attempts before an identifier is skipped.
    pub max_retries: u32,
    /// Per-request timeout, seconds.
    pub request_timeout_secs: u64,
    /// Base retry delay, seconds. Doubled per attempt on HTTP 429.
    pub initial_delay_secs: u64,
    /// Lower bound of the per-identifier throttle delay, seconds.
    pub throttle_min_secs: f64,
    /// Upper bound of the per-identifier throttle delay, seconds.
    pub throttle_max_secs: f64,
    /// How long to wait for dynamically rendered DOM elements, seconds.
    pub wait_timeout_secs: u64,
    /// Pause between cells in the sequential (HTTP-triggered) variant, seconds.
    pub cell_delay_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ports_file: PathBuf::from("ports.csv"),
            years: Vec::new(),
            months: Vec::new(),
            source: String::new(),
            source_code: String::new(),
            base_url: "https://monitoring-inaportnet.dephub.go.id/monitoring/layanan"
                .to_string(),
            detail_url: "https://monitoring-inaportnet.dephub.go.id/monitoring/detail?nomor_pkk="
                .to_string(),
            domestic_marker: ".DN.".to_string(),
            gcs_bucket: String::new(),
            bq_project: String::new(),
            bq_dataset: String::new(),
            bq_table: String::new(),
            blob_prefix: "scraping_results".to_string(),
            workers: 4,
            max_retries: 5,
            request_timeout_secs: 30,
            initial_delay_secs: 5,
            throttle_min_secs: 5.0,
            throttle_max_secs: 10.0,
            wait_timeout_secs: 15,
            cell_delay_secs: 2,
        }
    }
}

impl Settings {
    /// Load settings from an explicit file, or from `pkkacquire.toml` when it
    /// exists, falling back to defaults. Environment overrides apply last.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut settings = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env();
        Ok(settings)
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply `PKK_*` environment variable overrides.
    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("PKK_PORTS_FILE") {
            self.ports_file = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("PKK_YEARS") {
            self.years = split_list(&v);
        }
        if let Ok(v) = std::env::var("PKK_MONTHS") {
            self.months = split_list(&v);
        }
        if let Ok(v) = std::env::var("PKK_SOURCE") {
            self.source = v;
        }
        if let Ok(v) = std::env::var("PKK_SOURCE_CODE") {
            self.source_code = v;
        }
        if let Ok(v) = std::env::var("PKK_BASE_URL") {
            self.base_url = v;
        }
        if let Ok(v) = std::env::var("PKK_DETAIL_URL") {
            self.detail_url = v;
        }
        if let Ok(v) = std::env::var("PKK_GCS_BUCKET") {
            self.gcs_bucket = v;
        }
        if let Ok(v) = std::env::var("PKK_BQ_PROJECT") {
            self.bq_project = v;
        }
        if let Ok(v) = std::env::var("PKK_BQ_DATASET") {
            self.bq_dataset = v;
        }
        if let Ok(v) = std::env::var("PKK_BQ_TABLE") {
            self.bq_table = v;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn cell_delay(&self) -> Duration {
        Duration::from_secs(self.cell_delay_secs)
    }
}

/// Split a comma-separated list, dropping empty entries.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_portal_behavior() {
        let settings = Settings::default();
        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.workers, 4);
        assert_eq!(settings.domestic_marker, ".DN.");
        assert_eq!(settings.wait_timeout_secs, 15);
        assert!(settings.detail_url.ends_with("nomor_pkk="));
    }

    #[test]
    fn split_list_trims_and_drops_empties() {
        assert_eq!(split_list("1, 2,,3 "), vec!["1", "2", "3"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let settings: Settings =
            toml::from_str("months = [\"1\", \"2\"]\ngcs_bucket = \"my-bucket\"").unwrap();
        assert_eq!(settings.months, vec!["1", "2"]);
        assert_eq!(settings.gcs_bucket, "my-bucket");
        assert_eq!(settings.max_retries, 5);
    }
}
